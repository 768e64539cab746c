mod support;

#[cfg(test)]
mod spec {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use cache_container::presets::{self, STANDALONE_CONFIGURATION_PATH};
    use cache_container::{
        ContainerSpecBuilder, Endpoint, ErrorKind, FileMount, MountMode, ProtocolVersion,
        ReadinessCondition, ResourceLocator, TransportStrategy,
    };
    use rstest::rstest;

    use crate::support::*;

    #[rstest]
    #[case::tagged("cache-server:9.1.4", "cache-server", "9.1.4")]
    #[case::untagged("cache-server", "cache-server", "latest")]
    #[case::namespaced("jboss/infinispan-server:9.1.3.Final", "jboss/infinispan-server", "9.1.3.Final")]
    #[case::registry_port("localhost:5000/cache-server", "localhost:5000/cache-server", "latest")]
    fn test_image_reference(#[case] reference: &str, #[case] image: &str, #[case] version: &str) {
        let spec = ContainerSpecBuilder::new(reference)
            .with_exposed_endpoint("hotrod", 11222)
            .build()
            .unwrap();
        assert_eq!(spec.image(), image);
        assert_eq!(spec.version(), version);
        assert_eq!(spec.image_reference(), format!("{image}:{version}"));
    }

    #[rstest]
    #[case::empty(&[], &["standalone"])]
    #[case::flags(&["-b", "0.0.0.0"], &["-b", "0.0.0.0", "standalone"])]
    #[case::already_present(&["standalone", "-c", "x.xml"], &["standalone", "-c", "x.xml"])]
    #[case::duplicated(&["standalone", "standalone"], &["standalone"])]
    fn test_command_carries_startup_mode(#[case] tokens: &[&str], #[case] expected: &[&str]) {
        let spec = cache_server()
            .with_command(tokens.iter().copied())
            .build()
            .unwrap();
        assert_eq!(spec.command(), expected);
    }

    #[test]
    fn test_missing_cache_endpoint() {
        let err = ContainerSpecBuilder::new(CACHE_SERVER_IMAGE)
            .with_exposed_endpoint("rest", 8080)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingEndpoint);
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_renamed_cache_endpoint() {
        let spec = ContainerSpecBuilder::new(CACHE_SERVER_IMAGE)
            .with_exposed_endpoint("hr", 11322)
            .with_cache_endpoint_name("hr")
            .build()
            .unwrap();
        assert_eq!(
            spec.cache_endpoint(),
            &Endpoint {
                name: "hr".to_string(),
                port: 11322
            }
        );
    }

    #[test]
    fn test_redeclared_endpoint_replaces_port() {
        let spec = cache_server()
            .with_exposed_endpoint("hotrod", 11322)
            .build()
            .unwrap();
        assert_eq!(spec.endpoints().len(), 1);
        assert_eq!(spec.cache_endpoint().port, 11322);
    }

    #[test]
    fn test_default_readiness_probes_cache_endpoint() {
        let spec = ContainerSpecBuilder::new(CACHE_SERVER_IMAGE)
            .with_exposed_endpoint("hotrod", 11222)
            .build()
            .unwrap();
        assert!(matches!(
            spec.readiness(),
            ReadinessCondition::PortListening { endpoint, .. } if endpoint == "hotrod"
        ));
    }

    #[test]
    fn test_readiness_validation() {
        let err = cache_server()
            .with_readiness_condition(ReadinessCondition::port_listening(
                "rest",
                Duration::from_secs(1),
            ))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownEndpoint);

        let err = cache_server()
            .with_readiness_condition(ReadinessCondition::log_message(
                "started (in",
                1,
                Duration::from_secs(1),
            ))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    fn test_resource_mount() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("infinispan-standalone.xml"), "<server/>").unwrap();
        let locator = ResourceLocator::new([root.path()]);

        let spec = cache_server()
            .with_resource_mount(
                &locator,
                "infinispan-standalone.xml",
                STANDALONE_CONFIGURATION_PATH,
                MountMode::ReadOnly,
            )
            .unwrap()
            .build()
            .unwrap();
        let FileMount {
            source,
            destination,
            mode,
        } = &spec.mounts()[0];
        assert!(source.is_absolute());
        assert_eq!(source.file_name().unwrap(), "infinispan-standalone.xml");
        assert_eq!(destination, STANDALONE_CONFIGURATION_PATH);
        assert_eq!(*mode, MountMode::ReadOnly);

        let err = cache_server()
            .with_resource_mount(&locator, "missing.xml", "/conf.xml", MountMode::ReadOnly)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceNotFound);
    }

    #[test]
    fn test_protocol_below_floor_fails_before_any_container() {
        let ctx = TestContext::new();
        let err = cache_server()
            .with_protocol_version(ProtocolVersion::V1_3)
            .with_caches(["testCache"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolTooOld);
        assert!(err.to_string().contains("2.0"));
        assert_eq!(ctx.runtime.created(), 0);
    }

    #[test]
    fn test_no_caches_needs_no_gate() {
        let spec = cache_server()
            .with_image_version("7.2.0.Final")
            .with_protocol_version(ProtocolVersion::V1_0)
            .with_caches(Vec::<String>::new())
            .unwrap()
            .build()
            .unwrap();
        assert!(spec.caches().is_empty());
        assert_eq!(spec.requested_protocol_version(), Some(ProtocolVersion::V1_0));
    }

    #[test]
    fn test_version_change_after_caches_is_rechecked() {
        let builder = cache_server().with_caches(["testCache"]).unwrap();
        let err = builder
            .with_image_version("9.0.3.Final")
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerTooOld);
    }

    #[test]
    fn test_protocol_version_defaults_to_current() {
        let spec = cache_server().build().unwrap();
        assert_eq!(spec.protocol_version(), ProtocolVersion::CURRENT);
        assert_eq!(spec.requested_protocol_version(), None);
    }

    #[rstest]
    #[case::standalone(presets::standalone("9.1.4.Final"), TransportStrategy::Default)]
    #[case::clustered(presets::clustered("9.1.4.Final"), TransportStrategy::SuppressTopologyUpdates)]
    fn test_presets(#[case] builder: ContainerSpecBuilder, #[case] strategy: TransportStrategy) {
        let spec = builder.build().unwrap();
        assert_eq!(spec.image(), presets::IMAGE_NAME);
        assert_eq!(spec.version(), "9.1.4.Final");
        assert_eq!(spec.cache_endpoint().port, 11222);
        assert_eq!(spec.transport_strategy(), strategy);
        assert_eq!(spec.readiness(), &presets::started_log_condition());
        assert_eq!(spec.readiness().timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_factory_with_configuration_file() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("infinispan-standalone.xml"), "<server/>").unwrap();

        let spec = presets::factory("9.1.3.Final")
            .with_locator(ResourceLocator::new([root.path()]))
            .configuration_file("infinispan-standalone.xml")
            .unwrap()
            .caches(["testCache"])
            .unwrap()
            .expose()
            .hotrod_on(11322)
            .and()
            .rest_on(8180)
            .build()
            .unwrap();
        assert_eq!(spec.cache_endpoint().port, 11322);
        assert_eq!(spec.endpoint("rest").unwrap().port, 8180);
        assert_eq!(spec.caches(), ["testCache"]);
        assert_eq!(
            Path::new(&spec.mounts()[0].destination),
            Path::new(STANDALONE_CONFIGURATION_PATH)
        );
    }
}
