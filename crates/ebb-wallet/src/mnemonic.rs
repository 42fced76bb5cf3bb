//! BIP-39 mnemonic generation and parsing.
//!
//! Generation is the only randomized operation in the whole engine;
//! everything downstream of the word list is deterministic.

use bip39::{Language, Mnemonic};
use rand::RngCore;

use crate::error::WalletError;

/// Entropy strengths accepted by [`generate_mnemonic`], in bits.
pub const SUPPORTED_STRENGTHS: [usize; 5] = [128, 160, 192, 224, 256];

/// Generate a fresh mnemonic from OS entropy.
///
/// `strength_bits` selects the entropy size: 128 through 256 in 32-bit
/// steps, yielding 12 through 24 words from the English wordlist.
pub fn generate_mnemonic(strength_bits: usize) -> Result<Vec<String>, WalletError> {
    if !SUPPORTED_STRENGTHS.contains(&strength_bits) {
        return Err(WalletError::UnsupportedStrength(strength_bits));
    }
    let mut entropy = vec![0u8; strength_bits / 8];
    rand::rngs::OsRng.fill_bytes(&mut entropy);
    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.words().map(str::to_string).collect())
}

/// Parse a word list and derive the 64-byte root seed.
///
/// Whitespace inside words is not tolerated; case is normalized. The seed
/// uses an empty passphrase, matching the derivation scheme other
/// implementations of this engine must follow.
pub fn mnemonic_to_seed(words: &[String]) -> Result<[u8; 64], WalletError> {
    let phrase = words
        .iter()
        .map(|w| w.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    let mnemonic = Mnemonic::parse_in(Language::English, &phrase)
        .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_seed(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(phrase: &str) -> Vec<String> {
        phrase.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn strength_maps_to_word_count() {
        for (bits, count) in [(128, 12), (160, 15), (192, 18), (224, 21), (256, 24)] {
            let m = generate_mnemonic(bits).unwrap();
            assert_eq!(m.len(), count, "strength {bits}");
        }
    }

    #[test]
    fn unsupported_strength_rejected() {
        for bits in [0, 64, 129, 192 + 1, 512] {
            assert_eq!(
                generate_mnemonic(bits).unwrap_err(),
                WalletError::UnsupportedStrength(bits)
            );
        }
    }

    #[test]
    fn generated_mnemonics_differ() {
        let a = generate_mnemonic(256).unwrap();
        let b = generate_mnemonic(256).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn generated_mnemonic_parses() {
        let m = generate_mnemonic(128).unwrap();
        assert!(mnemonic_to_seed(&m).is_ok());
    }

    #[test]
    fn seed_deterministic() {
        let m = words("abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about");
        assert_eq!(mnemonic_to_seed(&m).unwrap(), mnemonic_to_seed(&m).unwrap());
    }

    #[test]
    fn case_normalized() {
        let lower = words("abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about");
        let upper = words("ABANDON abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon ABOUT");
        assert_eq!(
            mnemonic_to_seed(&lower).unwrap(),
            mnemonic_to_seed(&upper).unwrap()
        );
    }

    #[test]
    fn invalid_word_rejected() {
        let m = words("abandon abandon notaword");
        assert!(matches!(
            mnemonic_to_seed(&m).unwrap_err(),
            WalletError::InvalidMnemonic(_)
        ));
    }

    #[test]
    fn bad_checksum_rejected() {
        // 11 * "abandon" + "zoo" fails the checksum
        let mut m = vec!["abandon".to_string(); 11];
        m.push("zoo".to_string());
        assert!(matches!(
            mnemonic_to_seed(&m).unwrap_err(),
            WalletError::InvalidMnemonic(_)
        ));
    }
}
