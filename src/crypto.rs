//! Opaque token generation for invite links and result tokens.

/// Default token length in characters.
pub const DEFAULT_TOKEN_LENGTH: usize = 32;

/// Generates a cryptographically secure random token.
///
/// Alphanumeric characters only (a-z, A-Z, 0-9), roughly 5.95 bits of
/// entropy per character.
pub fn generate_token(length: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(rand::distributions::Alphanumeric)))
        .collect()
}

/// Generates a token with the default length (32 characters).
pub fn generate_token_default() -> String {
    generate_token(DEFAULT_TOKEN_LENGTH)
}

/// Lowercase variant used for slug collision suffixes, so slugs stay
/// uniformly lowercase.
pub fn generate_suffix(length: usize) -> String {
    generate_token(length).to_lowercase()
}
