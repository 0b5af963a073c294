//! Loading settings from a process environment that holds non-UTF-8 values.

#![cfg(unix)]

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use figment::Jail;

use consoleai::Configuration;

#[test]
fn non_utf8_environment_is_skipped() {
    Jail::expect_with(|jail| {
        jail.set_env("ConnectionStrings__openAi", "Endpoint=https://api.openai.com/v1;Key=sk");
        // SAFETY: this binary runs a single test, so nothing else touches the
        // environment concurrently.
        unsafe {
            std::env::set_var("CONSOLEAI_BYTES", OsStr::from_bytes(b"f\xffo"));
            std::env::set_var(
                OsStr::from_bytes(b"AI__Azure\xffOrOpenAI"),
                OsStr::from_bytes(b"azure"),
            );
        }

        let loaded = Configuration::load(None);

        unsafe {
            std::env::remove_var("CONSOLEAI_BYTES");
            std::env::remove_var(OsStr::from_bytes(b"AI__Azure\xffOrOpenAI"));
        }

        let config = loaded.unwrap();
        assert!(!config.selects_azure());
        assert_eq!(
            config.openai_connection_string(),
            Some("Endpoint=https://api.openai.com/v1;Key=sk")
        );
        Ok(())
    });
}
