use std::{
    ffi::CStr,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
};

use crate::error::ConfigError;

/// First IPv4 address bound to `name`.
pub fn interface_ipv4(name: &str) -> Result<Ipv4Addr, ConfigError> {
    let mut addrs: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut addrs) } != 0 {
        return Err(ConfigError::InterfaceQuery(io::Error::last_os_error()));
    }

    let mut found = None;
    let mut cursor = addrs;
    while !cursor.is_null() {
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        if entry.ifa_addr.is_null() || entry.ifa_name.is_null() {
            continue;
        }
        let family = i32::from(unsafe { (*entry.ifa_addr).sa_family });
        if family != libc::AF_INET {
            continue;
        }
        let ifname = unsafe { CStr::from_ptr(entry.ifa_name) };
        if ifname.to_bytes() != name.as_bytes() {
            continue;
        }

        let sockaddr = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
        found = Some(Ipv4Addr::from(u32::from_be(sockaddr.sin_addr.s_addr)));
        break;
    }

    unsafe { libc::freeifaddrs(addrs) };

    found.ok_or_else(|| ConfigError::InterfaceNotFound(name.to_string()))
}

/// Address to bind on: the interface's IPv4 address, or every interface when
/// no name is configured.
pub fn bind_address(interface_name: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    let ip = if interface_name.is_empty() {
        Ipv4Addr::UNSPECIFIED
    } else {
        interface_ipv4(interface_name)?
    };
    Ok(SocketAddr::new(IpAddr::V4(ip), port))
}
