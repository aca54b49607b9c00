#![no_main]
use libfuzzer_sys::fuzz_target;
use oxips::ips;

fuzz_target!(|data: &[u8]| {
    // The decoder must never panic, only return errors.
    let _ = ips::decode(data);

    // Anything that decodes must apply to a large enough target.
    if let Ok(table) = ips::decode(data) {
        let mut target = vec![0u8; table.required_len()];
        ips::apply(&table, &mut target).unwrap();
    }
});
