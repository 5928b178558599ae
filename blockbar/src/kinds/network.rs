use crate::block::{Reading, RefreshContext, Settings, Source};
use crate::config::{expect_bool, expect_str};
use crate::error::ConfigError;
use anyhow::Context;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddrV4, SocketAddrV6};
use std::process::Command;

/// Addresses of one interface, optionally coloured by Wi-Fi signal
#[derive(Default)]
pub struct Network {
    interface: Option<String>,
    format_disconnected: Option<String>,
    color_auto: bool,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default, PartialEq)]
struct Addresses {
    ipv4: Option<Ipv4Addr>,
    ipv6: Option<Ipv6Addr>,
}

fn interface_addresses(interface: &str) -> anyhow::Result<Addresses> {
    let mut found = Addresses::default();
    for ifaddr in nix::ifaddrs::getifaddrs().context("listing interface addresses")? {
        if ifaddr.interface_name != interface {
            continue;
        }
        let Some(address) = ifaddr.address else {
            continue;
        };
        if let Some(sin) = address.as_sockaddr_in() {
            found.ipv4 = Some(*SocketAddrV4::from(*sin).ip());
        } else if let Some(sin6) = address.as_sockaddr_in6() {
            found.ipv6 = Some(*SocketAddrV6::from(*sin6).ip());
        }
    }
    Ok(found)
}

/// Average signal in dBm from `iw dev <if> station dump` output
fn parse_rssi(dump: &str) -> Option<i32> {
    dump.lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            match (words.next(), words.next(), words.next()) {
                (Some("signal"), Some("avg:"), Some(value)) => value.parse().ok(),
                _ => None,
            }
        })
        .last()
}

fn station_rssi(interface: &str) -> Option<i32> {
    let output = Command::new("iw")
        .args(["dev", interface, "station", "dump"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_rssi(&String::from_utf8_lossy(&output.stdout))
}

/// Linear map of `x` from `[a, b]` to `[0, 255]`, clamped
fn channel(x: f64, a: f64, b: f64) -> u8 {
    ((x - a) * 255.0 / (b - a)).clamp(0.0, 255.0) as u8
}

/// Red for a weak signal, through yellow, to green for a strong one
fn rssi_color(rssi: i32) -> String {
    let rssi = rssi as f64;
    let r = channel(rssi, 0.0, -50.0);
    let g = channel(rssi, -100.0, -50.0);
    format!("#{:02x}{:02x}00", r, g)
}

impl Source for Network {
    fn configure(
        &mut self,
        key: &str,
        value: &toml::Value,
        location: &str,
    ) -> Result<bool, ConfigError> {
        match key {
            "interface" => self.interface = Some(expect_str(value, location)?.to_string()),
            "format-disconnected" => {
                self.format_disconnected = Some(expect_str(value, location)?.to_string())
            }
            "color-auto" => self.color_auto = expect_bool(value, location)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn validate(&self, _settings: &Settings, location: &str) -> Result<(), ConfigError> {
        if self.interface.is_none() {
            return Err(ConfigError::MissingKey {
                location: format!("{}.interface", location),
            });
        }
        Ok(())
    }

    fn refresh(&mut self, _ctx: &RefreshContext<'_>) -> anyhow::Result<Reading> {
        let interface = self.interface.as_deref().context("no interface")?;
        let addresses = interface_addresses(interface)?;

        let mut reading = Reading::new();
        match addresses.ipv4 {
            Some(ipv4) => {
                if self.color_auto {
                    if let Some(rssi) = station_rssi(interface) {
                        reading = reading.style("color", rssi_color(rssi));
                    }
                }
                let ipv6 = addresses.ipv6.map(|ip| ip.to_string()).unwrap_or_default();
                reading = reading
                    .field("ipv4", ipv4.to_string())
                    .field("ipv6", ipv6);
            }
            None => {
                if self.color_auto {
                    reading = reading.clear_style("color");
                }
                match &self.format_disconnected {
                    Some(format) => reading = reading.with_format(format.clone()),
                    None => reading = reading.field("ipv4", "").field("ipv6", ""),
                }
            }
        }
        Ok(reading)
    }
}
