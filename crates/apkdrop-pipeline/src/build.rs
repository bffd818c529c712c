//! Build tool invocation

use apkdrop_core::config::BuildConfig;
use apkdrop_core::{BuildMode, BuildSelection};

use crate::runner::CommandSpec;

/// `flutter build apk` invocation for a selection
pub fn build_command(selection: &BuildSelection, config: &BuildConfig) -> CommandSpec {
    let mut spec = CommandSpec::new(&config.flutter_path).args(["build", "apk"]);

    // Mode
    spec = match selection.mode {
        BuildMode::Debug => spec.arg("--debug"),
        BuildMode::Release => spec.arg("--split-per-abi"),
    };

    // Flavor, also exposed to Dart code
    let flavor = selection.flavor.as_str();
    spec = spec
        .args(["--flavor", flavor])
        .arg("--dart-define")
        .arg(format!("FLAVOR={}", flavor));

    spec.args(config.extra_args.iter().cloned())
}
