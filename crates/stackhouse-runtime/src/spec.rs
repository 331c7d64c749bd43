//! Container creation spec building.
//!
//! Translates a stored service definition into the Docker create request.

use std::collections::HashMap;

use bollard::container::Config;
use bollard::models::{HostConfig, PortBinding};
use stackhouse_store::Service;

/// Build the Docker create request for a service.
///
/// - Environment becomes a `KEY=value` list.
/// - Every declared port is exposed as `port/tcp`; only ports with a host
///   port get a host binding.
/// - Volumes become `host:container` bind mounts.
#[must_use]
pub fn build_container_config(service: &Service) -> Config<String> {
    let config = &service.container_config;

    let exposed_ports: HashMap<String, HashMap<(), ()>> = config
        .ports
        .iter()
        .map(|p| (port_key(p.container_port), HashMap::new()))
        .collect();

    let port_bindings: HashMap<String, Option<Vec<PortBinding>>> = config
        .ports
        .iter()
        .filter_map(|p| {
            p.host_port.map(|host| {
                (
                    port_key(p.container_port),
                    Some(vec![PortBinding {
                        host_ip: None,
                        host_port: Some(host.to_string()),
                    }]),
                )
            })
        })
        .collect();

    let binds: Vec<String> = config.volumes.iter().map(|v| v.bind_spec()).collect();

    Config {
        image: Some(service.image.clone()),
        env: Some(config.env_pairs()),
        exposed_ports: Some(exposed_ports),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        host_config: Some(HostConfig {
            port_bindings: Some(port_bindings),
            binds: Some(binds),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn port_key(container_port: u16) -> String {
    format!("{container_port}/tcp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackhouse_core::{ContainerConfig, PortMapping, ServiceId, StackId, VolumeBinding};

    fn service(config: ContainerConfig) -> Service {
        Service {
            stack_id: StackId::parse("shop").unwrap(),
            id: ServiceId::parse("web").unwrap(),
            name: "web".into(),
            image: "nginx:1.25".into(),
            container_config: config,
        }
    }

    #[test]
    fn maps_ports_env_and_volumes() {
        let mut config = ContainerConfig::default();
        config.ports = vec![
            PortMapping {
                container_port: 80,
                host_port: Some(8080),
            },
            PortMapping {
                container_port: 9000,
                host_port: None,
            },
        ];
        config.environment.insert("MODE".into(), "prod".into());
        config.volumes.push(VolumeBinding {
            host_path: "/srv".into(),
            container_path: "/data".into(),
        });

        let built = build_container_config(&service(config));

        assert_eq!(built.image.as_deref(), Some("nginx:1.25"));
        assert_eq!(built.env, Some(vec!["MODE=prod".to_string()]));

        let exposed = built.exposed_ports.unwrap();
        assert!(exposed.contains_key("80/tcp"));
        assert!(exposed.contains_key("9000/tcp"));

        let host = built.host_config.unwrap();
        let bindings = host.port_bindings.unwrap();
        assert_eq!(bindings.len(), 1);
        let binding = bindings["80/tcp"].as_ref().unwrap();
        assert_eq!(binding[0].host_port.as_deref(), Some("8080"));
        assert_eq!(host.binds, Some(vec!["/srv:/data".to_string()]));
    }

    #[test]
    fn empty_config_builds_empty_collections() {
        let built = build_container_config(&service(ContainerConfig::default()));
        assert_eq!(built.env, Some(Vec::new()));
        assert!(built.exposed_ports.unwrap().is_empty());
        assert_eq!(built.attach_stdout, Some(true));
    }
}
