use std::net::{SocketAddr, TcpListener};

use socket2::{Domain, Socket, Type};

/// Binds a listening socket on a free localhost port.
pub fn get_listener_on_free_port() -> TcpListener {
    let addr = &"127.0.0.1:0".parse::<SocketAddr>().unwrap().into();
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None).unwrap();
    socket.set_reuse_address(true).unwrap();
    socket.bind(addr).unwrap();
    socket.listen(1).unwrap();
    TcpListener::from(socket)
}

/// Finds a random open port available for listening at, by binding to port
/// "zero" and dropping the listener again. Another process may grab the port
/// before the caller binds it, which is acceptable for tests.
pub fn get_random_available_port() -> u16 {
    for _ in 0..10000 {
        let listener = get_listener_on_free_port();
        let port = listener.local_addr().unwrap().port();
        if port < 55535 {
            return port;
        }
    }
    panic!("Couldn't get a valid port");
}

/// Returns a port on which nothing listens right now.
pub fn get_closed_port() -> u16 {
    let port = get_random_available_port();
    assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    port
}
