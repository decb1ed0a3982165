#[test]
fn ui_pass() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/pass/entity_defaults.rs");
    t.pass("tests/ui/pass/entity_custom_table_and_columns.rs");
    t.pass("tests/ui/pass/entity_typed_columns.rs");
}

#[test]
#[ignore = "compiler diagnostics differ between toolchains; run manually with TRYBUILD=overwrite"]
fn ui_compile_fail() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/ui/fail/entity_missing_id.rs");
    t.compile_fail("tests/ui/fail/entity_duplicate_id.rs");
    t.compile_fail("tests/ui/fail/entity_unsupported_type.rs");
    t.compile_fail("tests/ui/fail/entity_unknown_column.rs");
    t.compile_fail("tests/ui/fail/entity_column_type_mismatch.rs");
}
