use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Once;

use corepwr_sensor::msr::{MSR_PKG_POWER_INFO, MSR_RAPL_POWER_UNIT};
use tempfile::TempDir;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_ids(true)
                    .json(),
            )
            .with(filter)
            .init();
    });
}

/// A temporary register tree standing in for `/dev/cpu`: one subdirectory
/// per fake core, each with an 8-byte-addressable register file.
pub struct FakeRegisterTree {
    dir: TempDir,
}

#[allow(dead_code)]
impl FakeRegisterTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a core whose unit register carries `unit_bits` and whose
    /// power-info register carries `raw_power`.
    pub fn add_core(&self, name: &str, unit_bits: u64, raw_power: u64) {
        let core_dir = self.path().join(name);
        std::fs::create_dir(&core_dir).expect("create core dir");
        let file = File::create(core_dir.join("msr")).expect("create register file");
        file.write_all_at(&unit_bits.to_le_bytes(), MSR_RAPL_POWER_UNIT)
            .expect("write unit register");
        file.write_all_at(&raw_power.to_le_bytes(), MSR_PKG_POWER_INFO)
            .expect("write power register");
    }

    /// Add a directory entry with no register file inside.
    pub fn add_bare_entry(&self, name: &str) {
        std::fs::create_dir(self.path().join(name)).expect("create bare dir");
    }

    /// Delete a core's register file, as a hot-unplugged or
    /// permission-revoked device would.
    pub fn remove_register(&self, name: &str) {
        std::fs::remove_file(self.path().join(name).join("msr")).expect("remove register file");
    }

    /// Rewrite a core's power-info register in place.
    pub fn set_power(&self, name: &str, raw_power: u64) {
        let file = File::options()
            .write(true)
            .open(self.path().join(name).join("msr"))
            .expect("open register file");
        file.write_all_at(&raw_power.to_le_bytes(), MSR_PKG_POWER_INFO)
            .expect("write power register");
    }
}
