#![no_main]
use libfuzzer_sys::fuzz_target;
use linestream::{LineConfig, LineWriter};

fn run(data: &[u8], chunk: usize, config: LineConfig) -> Vec<u8> {
    let mut writer = LineWriter::with_config(linestream::WriteSink::new(Vec::new()), config);
    for part in data.chunks(chunk) {
        writer.write(part).unwrap();
        assert!(!writer.buffered().contains(&config.terminator));
    }
    writer.close().unwrap();
    writer.into_sink().into_inner()
}

// First byte picks the chunk size and terminator, the rest is the stream.
fuzz_target!(|data: &[u8]| {
    let Some((&selector, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(selector % 16) + 1;
    let config = LineConfig::new().with_terminator(if selector & 0x80 == 0 { b'\n' } else { 0 });

    let whole = run(stream, stream.len().max(1), config);
    let chunked = run(stream, chunk, config);
    assert_eq!(whole, chunked);
});
