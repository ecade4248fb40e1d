//! Payout address validation (BSC / EVM style `0x` + 40 hex digits).

use crate::error::{LedgerError, Result};

const PREFIX: &str = "0x";
const ADDRESS_LEN: usize = 42;

/// Whether mixed-case checksum validation is compiled in
pub const fn checksum_available() -> bool {
    cfg!(feature = "checksum")
}

/// Validate a user-submitted payout address and return the form to store.
///
/// Surrounding whitespace is ignored. With checksum support, an all-lowercase or
/// all-uppercase address is accepted as unambiguous input, a mixed-case address
/// must match its EIP-55 checksum exactly, and the checksummed form is returned.
/// Without it, only prefix, length and hex digits are checked.
pub fn validate_address(input: &str) -> Result<String> {
    let candidate = input.trim();
    if !has_address_shape(candidate) {
        return Err(LedgerError::InvalidAddressFormat);
    }
    canonicalize(candidate)
}

fn has_address_shape(candidate: &str) -> bool {
    candidate.len() == ADDRESS_LEN
        && candidate.starts_with(PREFIX)
        && candidate[PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(feature = "checksum")]
fn canonicalize(candidate: &str) -> Result<String> {
    use alloy_primitives::Address;

    let address: Address = candidate
        .parse()
        .map_err(|_| LedgerError::InvalidAddressFormat)?;
    let checksummed = address.to_checksum(None);

    let digits = &candidate[PREFIX.len()..];
    let single_case = !digits.chars().any(|c| c.is_ascii_lowercase())
        || !digits.chars().any(|c| c.is_ascii_uppercase());

    if candidate == checksummed || single_case {
        Ok(checksummed)
    } else {
        tracing::debug!(address = %candidate, "Mixed-case address failed checksum");
        Err(LedgerError::InvalidAddressFormat)
    }
}

#[cfg(not(feature = "checksum"))]
fn canonicalize(candidate: &str) -> Result<String> {
    tracing::warn!(
        "Checksum support not compiled in, payout address validated on format only"
    );
    Ok(candidate.to_string())
}
