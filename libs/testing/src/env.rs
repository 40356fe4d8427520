//! Scoped environment overrides.

use std::env;

/// Sets environment variables and restores the previous values on drop.
///
/// The process environment is global, so tests that use this must not run
/// concurrently with other tests reading the same keys.
#[derive(Debug)]
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut saved = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            saved.push((key.clone(), env::var(&key).ok()));
            env::set_var(&key, value.as_ref());
        }
        Self { saved }
    }

    /// Removes the given keys for the lifetime of the guard.
    pub fn unset<K: Into<String>>(keys: impl IntoIterator<Item = K>) -> Self {
        let mut saved = Vec::new();
        for key in keys {
            let key = key.into();
            saved.push((key.clone(), env::var(&key).ok()));
            env::remove_var(&key);
        }
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // restore in reverse so a key set twice ends at its original value
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => env::set_var(&key, v),
                None => env::remove_var(&key),
            }
        }
    }
}
