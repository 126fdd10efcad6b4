//! CIDR subdivision.
//!
//! Splits a parent IPv4 block into consecutive equal-sized subnets,
//! one per requested slot. Backs the `net/subnets` lookup kind: the
//! manifest asks for N blocks at a given prefix length and wires the
//! results into subnet declarations.

use std::net::Ipv4Addr;

use crate::error::{ProviderError, ProviderResult};

/// Split `parent` (e.g. `10.0.0.0/16`) into `count` consecutive
/// subnets with prefix length `new_bits`.
pub fn subdivide(parent: &str, count: usize, new_bits: u8) -> ProviderResult<Vec<String>> {
    let (base, parent_bits) = parse_cidr(parent)?;

    if new_bits > 32 {
        return Err(ProviderError::Permanent(format!(
            "prefix length /{} exceeds 32 bits",
            new_bits
        )));
    }
    if new_bits < parent_bits {
        return Err(ProviderError::Permanent(format!(
            "prefix length /{} is wider than the parent /{}",
            new_bits, parent_bits
        )));
    }

    let available = 1u64 << (new_bits - parent_bits);
    if count as u64 > available {
        return Err(ProviderError::Permanent(format!(
            "{} wants {} subnets but holds only {} at /{}",
            parent, count, available, new_bits
        )));
    }

    let subnet_size = 1u64 << (32 - new_bits);
    let mut address = u32::from(base) as u64;
    let mut subnets = Vec::with_capacity(count);
    for _ in 0..count {
        subnets.push(format!("{}/{}", Ipv4Addr::from(address as u32), new_bits));
        address += subnet_size;
    }
    Ok(subnets)
}

/// Parse `a.b.c.d/len`, masking the address down to its network base.
fn parse_cidr(cidr: &str) -> ProviderResult<(Ipv4Addr, u8)> {
    let invalid = || ProviderError::Permanent(format!("invalid CIDR block '{}'", cidr));

    let (addr, bits) = cidr.split_once('/').ok_or_else(invalid)?;
    let addr: Ipv4Addr = addr.parse().map_err(|_| invalid())?;
    let bits: u8 = bits.parse().map_err(|_| invalid())?;
    if bits > 32 {
        return Err(invalid());
    }

    let mask = if bits == 0 { 0 } else { u32::MAX << (32 - bits) };
    Ok((Ipv4Addr::from(u32::from(addr) & mask), bits))
}
