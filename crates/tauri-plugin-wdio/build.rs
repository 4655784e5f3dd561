// Uses tauri_plugin::Builder (not tauri_build::InlinedPlugin) so the ACL
// permissions in permissions/default.toml land in the generated manifest.
// Apps consuming the plugin grant `wdio:default` (or the individual
// `wdio:allow-*` permissions) in their capabilities file.

const COMMANDS: &[&str] = &[
    "execute",
    "set_mock",
    "get_mock",
    "clear_mocks",
    "reset_mocks",
    "restore_mocks",
    // Internal plumbing invoked by the injected frontend shim.
    "report_execute_result",
    "record_mock_call",
];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();
}
