//! OpenVPN configuration rendering.
//!
//! Substitutes issued credentials and connection parameters into the client
//! and server templates, and formats client-config-directory (CCD) entries.
//!
//! # Placeholders
//! - **Client**: `ServerIP`, `ServerPort`, `CACert`, `ClientCert`, `ClientKey`
//! - **Server**: `AS`, `ServerIP`, `ServerPort`, `Netmask`, `Subnet`, `CACert`,
//!   `ServerCert`, `ServerKey`

use crate::ca_store::CaStore;
use crate::error::{Result, VpnPkiError};
use crate::issuer::extract_common_name;
use crate::templates::{substitute, Substitutions};
use ipnet::IpNet;
use std::fs;
use std::net::IpAddr;
use std::path::Path;

/// Connection parameters and credentials for one VPN client.
#[derive(Debug, Clone, Copy)]
pub struct ClientConfigParams<'a> {
    pub server_address: IpAddr,
    pub server_port: u16,
    pub ca_cert_pem: &'a str,
    pub client_cert_pem: &'a str,
    pub client_key_pem: &'a str,
}

/// Parameters and credentials for one VPN server. The CA certificate is
/// passed separately.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfigParams<'a> {
    pub network_path: &'a str,
    /// Address of the server inside the VPN subnet
    pub server_vpn_address: IpAddr,
    pub server_port: u16,
    /// Address block of the VPN; netmask and CIDR text are derived from it
    pub subnet: IpNet,
    pub server_cert_pem: &'a str,
    pub server_key_pem: &'a str,
}

/// Render the client config. Unused substitutions are ignored.
pub fn render_client_config(template: &str, params: &ClientConfigParams<'_>) -> Result<String> {
    let values = Substitutions::new()
        .set("ServerIP", params.server_address)
        .set("ServerPort", params.server_port)
        .set("CACert", params.ca_cert_pem)
        .set("ClientCert", params.client_cert_pem)
        .set("ClientKey", params.client_key_pem);

    Ok(substitute(template, &values)?)
}

/// Render the server config embedding `ca_cert_pem`.
pub fn render_server_config(
    template: &str,
    ca_cert_pem: &str,
    params: &ServerConfigParams<'_>,
) -> Result<String> {
    let values = Substitutions::new()
        .set("AS", params.network_path)
        .set("ServerIP", params.server_vpn_address)
        .set("ServerPort", params.server_port)
        .set("Netmask", params.subnet.netmask())
        .set("Subnet", params.subnet.trunc())
        .set("CACert", ca_cert_pem)
        .set("ServerCert", params.server_cert_pem)
        .set("ServerKey", params.server_key_pem);

    Ok(substitute(template, &values)?)
}

/// Client-config-directory entry for a client certificate.
///
/// Returns `(common_name, "ifconfig-push <client-address> <netmask>")`; the
/// caller stores the line in a file named after the common name.
pub fn render_ccd_entry(
    client_cert_pem: &str,
    client_address: IpAddr,
    subnet_netmask: IpAddr,
) -> Result<(String, String)> {
    let common_name = extract_common_name(client_cert_pem.as_bytes())?;
    let config_line = format!("ifconfig-push {} {}", client_address, subnet_netmask);
    Ok((common_name, config_line))
}

/// Renders configs from the configured template files and the CA Store's certificate.
pub struct VpnConfigRenderer {
    ca_store: CaStore,
}

impl VpnConfigRenderer {
    pub fn new(ca_store: CaStore) -> Self {
        Self { ca_store }
    }

    /// Client config for a client holding `client_cert_pem` / `client_key_pem`.
    pub fn client_config(
        &self,
        server_address: IpAddr,
        server_port: u16,
        client_cert_pem: &str,
        client_key_pem: &str,
    ) -> Result<String> {
        let ca_cert_pem = self.ca_store.ca_cert_pem()?;
        let template = read_template(&self.ca_store.config().templates.client_config_path)?;
        render_client_config(
            &template,
            &ClientConfigParams {
                server_address,
                server_port,
                ca_cert_pem: &ca_cert_pem,
                client_cert_pem,
                client_key_pem,
            },
        )
    }

    /// Server config embedding the CA Store's certificate.
    pub fn server_config(&self, params: &ServerConfigParams<'_>) -> Result<String> {
        let ca_cert_pem = self.ca_store.ca_cert_pem()?;
        let template = read_template(&self.ca_store.config().templates.server_config_path)?;
        render_server_config(&template, &ca_cert_pem, params)
    }
}

fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| VpnPkiError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use std::net::Ipv4Addr;

    const CLIENT_TEMPLATE: &str = include_str!("../templates/client.conf.tmpl");
    const SERVER_TEMPLATE: &str = include_str!("../templates/server.conf.tmpl");

    fn client_params() -> ClientConfigParams<'static> {
        ClientConfigParams {
            server_address: IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)),
            server_port: 1194,
            ca_cert_pem: "CA-PEM",
            client_cert_pem: "CLIENT-CERT-PEM",
            client_key_pem: "CLIENT-KEY-PEM",
        }
    }

    #[test]
    fn test_client_template_fully_substituted() {
        let rendered = render_client_config(CLIENT_TEMPLATE, &client_params()).unwrap();
        assert!(!rendered.contains('$'));
        assert!(rendered.contains("remote 192.0.2.1 1194"));
        assert!(rendered.contains("<ca>\nCA-PEM\n</ca>"));
        assert!(rendered.contains("CLIENT-CERT-PEM"));
        assert!(rendered.contains("CLIENT-KEY-PEM"));
    }

    #[test]
    fn test_server_template_derives_subnet() {
        let params = ServerConfigParams {
            network_path: "1-ff00:0:110",
            server_vpn_address: IpAddr::V4(Ipv4Addr::new(10, 0, 8, 1)),
            server_port: 1194,
            subnet: "10.0.8.0/24".parse().unwrap(),
            server_cert_pem: "SERVER-CERT-PEM",
            server_key_pem: "SERVER-KEY-PEM",
        };
        let rendered = render_server_config(SERVER_TEMPLATE, "CA-PEM", &params).unwrap();
        assert!(!rendered.contains('$'));
        assert!(rendered.contains("ifconfig 10.0.8.1 255.255.255.0"));
        assert!(rendered.contains("/var/log/openvpn/1-ff00:0:110-status.log"));
        assert!(rendered.contains("10.0.8.0/24"));
        assert!(rendered.contains("SERVER-KEY-PEM"));
        assert!(rendered.contains("<ca>\nCA-PEM\n</ca>"));
    }

    #[test]
    fn test_subnet_text_uses_network_address() {
        let template = "$Subnet $Netmask";
        let params = ServerConfigParams {
            network_path: "1-ff00:0:110",
            server_vpn_address: IpAddr::V4(Ipv4Addr::new(10, 0, 8, 1)),
            server_port: 1194,
            subnet: "10.0.8.1/24".parse().unwrap(),
            server_cert_pem: "",
            server_key_pem: "",
        };
        assert_eq!(
            render_server_config(template, "", &params).unwrap(),
            "10.0.8.0/24 255.255.255.0"
        );
    }

    #[test]
    fn test_unknown_placeholder_is_template_error() {
        let err = render_client_config("remote $ServerHost", &client_params()).unwrap_err();
        assert!(matches!(
            err,
            VpnPkiError::Template(TemplateError::MissingPlaceholder { ref name }) if name == "ServerHost"
        ));
    }

    #[test]
    fn test_missing_template_file_is_io_error() {
        let err = read_template(Path::new("/nonexistent/client.conf.tmpl")).unwrap_err();
        assert!(matches!(err, VpnPkiError::Io { .. }));
    }
}
