#[test]
fn parley_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/parley_error_pass.rs");
}

#[test]
fn api_model_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/api_model_pass.rs");
}
