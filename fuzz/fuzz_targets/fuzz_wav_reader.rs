#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use vocstream_core::{downmix, WaveformReader};

fuzz_target!(|data: &[u8]| {
    let Ok(reader) = WaveformReader::new(Cursor::new(data)) else {
        return;
    };
    let channels = reader.metadata().num_channels;
    for chunk in reader.chunks(257) {
        let Ok(chunk) = chunk else {
            break;
        };
        // Reader chunks are always frame-aligned.
        assert!(downmix(chunk, channels).is_ok());
    }
});
