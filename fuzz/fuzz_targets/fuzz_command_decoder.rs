//! Fuzz target: `CommandDecoder`
//!
//! Drives arbitrary byte sequences into the streaming command decoder and
//! asserts that it never panics, that chunking does not change the
//! decoded commands, and that the blocking reader agrees with it.
//!
//! cargo fuzz run fuzz_command_decoder

#![no_main]

use homenode::device::is_auto_code;
use homenode::link::CommandDecoder;
use homenode::link::codec::decode_command;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut whole = CommandDecoder::new();
    let batch: Vec<_> = whole.feed(data).collect();

    for msg in &batch {
        assert_eq!(msg.mask.is_none(), is_auto_code(msg.category));
    }

    // Byte-at-a-time must decode the same commands.
    let mut single = CommandDecoder::new();
    let trickled: Vec<_> = data.iter().filter_map(|&b| single.push(b)).collect();
    assert_eq!(batch, trickled);
    assert_eq!(whole.is_idle(), single.is_idle());

    // The blocking reader yields the same prefix, then EOF or a truncation error.
    let mut reader = data;
    let mut read_back = Vec::new();
    while let Ok(Some(msg)) = decode_command(&mut reader) {
        read_back.push(msg);
    }
    assert_eq!(batch, read_back);

    whole.reset();
    assert!(whole.is_idle());
});
