//! Configuration parser tests: one fully-specified valid file checked
//! field by field, plus the table of invalid files with their exact
//! error messages.

use std::path::{Path, PathBuf};

use nbsync::config::{parse_config, Config, LoggerConfig, NetboxConfig};
use nbsync_source::SourceConfig;

fn testdata(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata/parser")
        .join(name)
}

#[test]
fn valid_config() {
    let want = Config {
        logger: LoggerConfig {
            level: 2,
            dest: "test".into(),
        },
        netbox: NetboxConfig {
            api_token: "netbox-token".into(),
            hostname: "netbox.example.com".into(),
            http_scheme: "https".into(),
            port: 666,
            validate_cert: false,
            timeout: None,
            ca_file: String::new(),
            tag: "netbox-ssot".into(),
            tag_color: "07426b".into(),
            remove_orphans: false,
            remove_orphans_after_days: Some(5),
            source_priority: vec![],
        },
        sources: vec![
            SourceConfig {
                name: "testolvm".into(),
                source_type: "ovirt".into(),
                http_scheme: "http".into(),
                port: 443,
                hostname: "testolvm.example.com".into(),
                username: "admin@internal".into(),
                password: "adminpass".into(),
                ignored_subnets: vec![
                    "172.16.0.0/12".into(),
                    "192.168.0.0/16".into(),
                    "fd00::/8".into(),
                ],
                validate_cert: true,
                tag: "testing".into(),
                tag_color: "ff0000".into(),
                ..Default::default()
            },
            SourceConfig {
                name: "paloalto".into(),
                source_type: "paloalto".into(),
                http_scheme: "http".into(),
                port: 443,
                hostname: "palo.example.com".into(),
                username: "svcuser".into(),
                password: "svcpassword".into(),
                ignored_subnets: vec![
                    "172.16.0.0/12".into(),
                    "192.168.0.0/16".into(),
                    "fd00::/8".into(),
                ],
                collect_arp_data: true,
                tag: "Source: paloalto".into(),
                tag_color: "f04e23".into(),
                ..Default::default()
            },
            SourceConfig {
                name: "prodolvm".into(),
                source_type: "ovirt".into(),
                port: 80,
                http_scheme: "https".into(),
                hostname: "ovirt.example.com".into(),
                username: "admin".into(),
                password: "adminpass".into(),
                ignored_subnets: vec!["172.16.0.0/12".into()],
                validate_cert: false,
                tag: "Source: prodolvm".into(),
                tag_color: "aa1409".into(),
                cluster_site_relations: vec![
                    "Cluster_NYC = New York".into(),
                    "Cluster_FFM.* = Frankfurt".into(),
                    "Datacenter_BERLIN/* = Berlin".into(),
                ],
                host_site_relations: vec![".* = Berlin".into()],
                cluster_tenant_relations: vec![
                    ".*Stark = Stark Industries".into(),
                    ".* = Default".into(),
                ],
                host_tenant_relations: vec![
                    ".*Health = Health Department".into(),
                    ".* = Default".into(),
                ],
                vm_tenant_relations: vec![
                    ".*Health = Health Department".into(),
                    ".* = Default".into(),
                ],
                ..Default::default()
            },
        ],
    };

    let got = parse_config(&testdata("valid_config1.yaml")).unwrap();
    assert_eq!(got, want);
}

#[test]
fn invalid_configs_produce_exact_errors() {
    let cases: &[(&str, &str)] = &[
        ("invalid_config1.yaml", "netbox.hostname: cannot be empty"),
        (
            "invalid_config2.yaml",
            "netbox.port: must be between 0 and 65535. Is 333333",
        ),
        ("invalid_config3.yaml", "source[testolvm].type is not valid"),
        (
            "invalid_config4.yaml",
            "netbox.httpScheme: must be either http or https. Is httpd",
        ),
        (
            "invalid_config5.yaml",
            "source[prodovirt].httpScheme: must be either http or https. Is httpd",
        ),
        (
            "invalid_config6.yaml",
            "source[testolvm].hostTenantRelations: invalid regex relation: \
             This should not work. Should be of format: regex = value",
        ),
        (
            "invalid_config7.yaml",
            "source[prodolvm].hostTenantRelations: invalid regex: [a-z++, \
             in relation: [a-z++ = Should not work",
        ),
        (
            "invalid_config8.yaml",
            "source[testolvm].port: must be between 0 and 65535. Is 1111111",
        ),
        ("invalid_config9.yaml", "logger.level: must be between 0 and 3"),
        ("invalid_config10.yaml", "netbox.timeout: cannot be negative"),
        ("invalid_config11.yaml", "netbox.apiToken: cannot be empty"),
        (
            "invalid_config12.yaml",
            "netbox.tagColor: must be a string of 6 hexadecimal characters",
        ),
        (
            "invalid_config13.yaml",
            "netbox.tagColor: must be a string of 6 lowercase hexadecimal characters",
        ),
        (
            "invalid_config14.yaml",
            "netbox.sourcePriority: len(config.Netbox.SourcePriority) != len(config.Sources)",
        ),
        (
            "invalid_config15.yaml",
            "netbox.sourcePriority: source[wrongone] doesn't exist in the sources array",
        ),
        ("invalid_config16.yaml", "source[].name: cannot be empty"),
        ("invalid_config17.yaml", "source[wrong].hostname: cannot be empty"),
        ("invalid_config18.yaml", "source[wrong].username: cannot be empty"),
        ("invalid_config19.yaml", "source[wrong].password: cannot be empty"),
        (
            "invalid_config20.yaml",
            "source[wrong].ignoredSubnets: wrong format: 172.16.0.1",
        ),
        (
            "invalid_config30.yaml",
            "source[fortigate].apiToken is required for fortigate",
        ),
        (
            "invalid_config31.yaml",
            "netbox.removeOrphansAfterDays has no effect when netbox.removeOrphans is set to true",
        ),
        (
            "invalid_config33.yaml",
            "source[wrong].caFile: open wrong/path: no such file or directory",
        ),
        (
            "invalid_config34.yaml",
            "netbox.caFile: open wrong path: no such file or directory",
        ),
        (
            "invalid_config35.yaml",
            "netbox.RemoveOrphansAfterDays: must be positive integer",
        ),
    ];

    for (file, want) in cases {
        let err = parse_config(&testdata(file))
            .expect_err(&format!("{file} should not parse"));
        assert_eq!(&err.to_string(), want, "wrong error for {file}");
    }
}

#[test]
fn invalid_relation_regexes_name_their_field() {
    let cases: &[(&str, &str)] = &[
        ("invalid_config22.yaml", "hostSiteRelations"),
        ("invalid_config23.yaml", "clusterSiteRelations"),
        ("invalid_config24.yaml", "clusterTenantRelations"),
        ("invalid_config25.yaml", "hostTenantRelations"),
        ("invalid_config26.yaml", "vmTenantRelations"),
        ("invalid_config27.yaml", "vlanGroupRelations"),
        ("invalid_config28.yaml", "vlanTenantRelations"),
        ("invalid_config32.yaml", "datacenterClusterGroupRelations"),
        ("invalid_config36.yaml", "wlanTenantRelations"),
    ];
    for (file, field) in cases {
        let err = parse_config(&testdata(file))
            .expect_err(&format!("{file} should not parse"));
        assert_eq!(
            err.to_string(),
            format!(
                "source[wrong].{field}: invalid regex: (wrong(), \
                 in relation: (wrong() = wwrong"
            ),
            "wrong error for {file}"
        );
    }
}

#[test]
fn interface_filter_errors_name_the_field() {
    let err = parse_config(&testdata("invalid_config21.yaml")).unwrap_err();
    assert!(
        err.to_string()
            .starts_with("source[wrong].interfaceFilter: wrong format: "),
        "got: {err}"
    );
}

#[test]
fn yaml_type_errors_surface_the_offending_value() {
    let err = parse_config(&testdata("invalid_config29.yaml")).unwrap_err();
    assert!(err.to_string().contains("2dasf"), "got: {err}");
}

#[test]
fn missing_file_reports_the_path() {
    let path = testdata("invalid_config1111.yaml");
    let err = parse_config(&path).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("open {}: no such file or directory", path.display())
    );
}
