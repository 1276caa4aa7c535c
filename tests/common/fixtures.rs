//! Builders for fixture trees used by the end-to-end tests.
//!
//! Each fixture carries a `run.sh` standing in for the compiled program.
//! Execution configs launch it through `sh`, passing the config's mode
//! first and the fixture's own args after it.

use std::fs;
use std::path::{Path, PathBuf};

/// Two configs, `baseline` (reference) and `optimized`.
pub const TWO_CONFIGS: &str = "\
configs:
  baseline:
    command: sh
    args: \"{fixture_dir}/run.sh {mode}\"
  optimized:
    command: sh
    args: \"{fixture_dir}/run.sh {mode}\"
    mode: optimized
select: [baseline, optimized]
";

pub fn write_harness(root: &Path, yaml: &str) {
    fs::write(root.join("harness.yaml"), yaml).expect("write harness.yaml");
}

/// Write a fixture directory with a manifest and a `run.sh` script.
pub fn write_fixture(root: &Path, rel_dir: &str, manifest: &str, script: &str) -> PathBuf {
    let dir = root.join(rel_dir);
    fs::create_dir_all(&dir).expect("fixture dir");
    fs::write(dir.join("fixture.yaml"), manifest).expect("write manifest");
    fs::write(dir.join("run.sh"), script).expect("write run.sh");
    dir
}

/// Fixture whose entry point is declared and whose output does not depend on the mode.
pub fn write_simple(root: &Path, id: &str, script: &str) -> PathBuf {
    write_fixture(root, id, &format!("entry_point: {id}.Main\n"), script)
}

/// Counts loop iterations up to `threshold=N`; `{mode}` arrives as $1 and
/// the fixture argument as $2.
pub const COUNT_SCRIPT: &str = "\
n=${2#threshold=}
i=0
count=0
while [ $i -lt $n ]; do
  count=$((count + 1))
  i=$((i + 1))
done
echo $count
";

/// Uncaught exception under every mode.
pub const CRASH_SCRIPT: &str = "\
echo 'before'
echo 'Exception in thread \"main\" java.lang.ArithmeticException: / by zero' >&2
exit 1
";

/// The optimized mode miscompiles the last line.
pub const MISCOMPILE_SCRIPT: &str = "\
echo 'line one'
if [ \"$1\" = optimized ]; then echo 'total=6'; else echo 'total=5'; fi
";

pub const SLEEP_SCRIPT: &str = "exec sleep 30\n";
