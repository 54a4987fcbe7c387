#![no_main]

use fatoora::rules::RuleEngine;
use fatoora::ValidationConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Parse, evaluate and re-serialize must not panic at any step.
        if let Ok(invoice) = fatoora::ubl::from_ubl_xml(s) {
            let engine = RuleEngine::new(ValidationConfig::default());
            let _ = engine.evaluate(&invoice, None);
            if let Ok(xml) = fatoora::ubl::to_ubl_xml(&invoice) {
                let _ = fatoora::ubl::from_ubl_xml(&xml);
            }
        }
    }
});
