use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        AfterimageError::config("x")
            .to_string()
            .contains("config error:")
    );
    assert!(
        AfterimageError::resource("x")
            .to_string()
            .contains("resource error:")
    );
    assert!(
        AfterimageError::render("x")
            .to_string()
            .contains("render error:")
    );
    assert!(AfterimageError::hook("x").to_string().contains("hook error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = AfterimageError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
