//! The `mysql_native_password` authentication plugin.
//!
//! <https://mariadb.com/kb/en/connection/#mysql_native_password-plugin>

use sha1::{Digest, Sha1};

pub const PLUGIN_NAME: &str = "mysql_native_password";

/// `SHA1( password ) ^ SHA1( seed + SHA1( SHA1( password ) ) )`
pub fn scramble(password: &str, seed: &[u8]) -> [u8; 20] {
    let mut ctx = Sha1::new();

    ctx.update(password);

    let mut pw_hash = [0_u8; 20];
    pw_hash.copy_from_slice(&ctx.finalize_reset());

    ctx.update(pw_hash);

    let pw_hash_hash = ctx.finalize_reset();

    ctx.update(seed);
    ctx.update(pw_hash_hash);

    let pw_seed_hash_hash = ctx.finalize();

    xor_eq(&mut pw_hash, &pw_seed_hash_hash);

    pw_hash
}

/// Check a client's auth response against the stored password.
///
/// An empty password is only matched by an empty response.
pub fn verify(password: &str, seed: &[u8], response: &[u8]) -> bool {
    if password.is_empty() {
        return response.is_empty();
    }

    // compare without short-circuiting on the first differing byte
    response.len() == 20
        && scramble(password, seed)
            .iter()
            .zip(response)
            .fold(0, |acc, (a, b)| acc | (a ^ b))
            == 0
}

// XOR(x, y)
// If len(y) < len(x), wrap around inside y
fn xor_eq(x: &mut [u8], y: &[u8]) {
    let y_len = y.len();

    for i in 0..x.len() {
        x[i] ^= y[i % y_len];
    }
}
