#![no_main]
use libfuzzer_sys::fuzz_target;
use oxips::ips::{self, PatchTable};

fuzz_target!(|data: &[u8]| {
    // Interpret the input as a sequence of small records:
    // [kind, addr_hi, addr_mid, addr_lo, len, fill/payload...].
    let mut table = PatchTable::new();
    let mut rest = data;
    while rest.len() >= 5 {
        let kind = rest[0] & 1;
        let address = u32::from_be_bytes([0, rest[1], rest[2], rest[3]]);
        let len = usize::from(rest[4]).max(1);
        rest = &rest[5..];

        // An address encoding as "EOF" cannot be represented.
        if address == ips::wire::EOF_ADDRESS {
            continue;
        }

        if kind == 0 {
            let take = len.min(rest.len());
            if take == 0 {
                break;
            }
            let _ = table.insert_standard(address, rest[..take].to_vec());
            rest = &rest[take..];
        } else {
            let fill = rest.first().copied().unwrap_or(0);
            let _ = table.insert_run_length(address, len as u16, fill);
            rest = rest.get(1..).unwrap_or(&[]);
        }
    }

    let bytes = ips::encode(&table);
    assert_eq!(bytes.len(), ips::encoded_len(&table));
    let decoded = ips::decode(&bytes).unwrap();
    assert_eq!(decoded, table);
});
