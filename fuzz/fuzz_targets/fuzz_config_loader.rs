#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = toml::from_str::<cop_config::Config>(data) {
        if cfg.validate().is_ok() {
            // Anything that validates must map onto core settings.
            let _ = cop_core::WorkerCfg::from(&cfg);
            let _ = cop_core::ViewCfg::from(&cfg);
        }
    }
});
