//! Default configuration values

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "apkdrop.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "apkdrop.toml";

/// Alternative configuration file name
pub const ALT_CONFIG_FILE: &str = ".apkdrop.yaml";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ALT_CONFIG_FILE,
        ".apkdrop.toml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# apkdrop configuration

flavors:
  - dev
  - raf
  - wellcare
  # a combined build is listed as one more flavor name:
  # - raf-wellcare

build:
  flutter_path: flutter
  output_dir: build/app/outputs/flutter-apk
  extra_args: []

archive:
  name_template: "{flavor}-build-apk.zip"
  extension: apk
  release_marker: release

upload:
  endpoint: https://oshi.at
  field_name: f
  fast_path_flavor: dev
  debug_artifact: "build/app/outputs/flutter-apk/app-{flavor}-debug.apk"
  link_marker: https://oshi.at
  cleanup_archive: true

pipeline:
  # stage_timeout_secs: 1800
  mailbox_capacity: 256
"#;
