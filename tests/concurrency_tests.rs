use linestream::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;

mod harness {
    pub mod faulty_writer;
    pub mod shared_buffer;
}
use harness::faulty_writer::{FaultMode, FaultyWriter};
use harness::shared_buffer::SharedBuffer;

const PRODUCERS: usize = 8;
const LINES_PER_PRODUCER: usize = 200;

fn expected_line(producer: usize, seq: usize) -> String {
    format!("producer-{producer:02} line-{seq:04} {}", "x".repeat(seq % 37))
}

/// Writes `line` plus a newline in random-sized fragments.
fn write_fragmented<W: Write>(writer: &mut W, line: &str, rng: &mut StdRng) {
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');
    let mut rest = bytes.as_slice();
    while !rest.is_empty() {
        let n = rng.gen_range(1..=rest.len().min(7));
        writer.write_all(&rest[..n]).unwrap();
        rest = &rest[n..];
    }
}

/// Every line must belong to one producer and each producer's lines must
/// appear in its own order.
fn assert_untorn(lines: &[String]) {
    assert_eq!(lines.len(), PRODUCERS * LINES_PER_PRODUCER);
    let mut next_seq: HashMap<usize, usize> = HashMap::new();
    for line in lines {
        let producer: usize = line[9..11]
            .parse()
            .unwrap_or_else(|_| panic!("torn line: {line:?}"));
        let seq = next_seq.entry(producer).or_default();
        assert_eq!(line, &expected_line(producer, *seq), "torn or reordered line");
        *seq += 1;
    }
    assert!(next_seq.values().all(|&n| n == LINES_PER_PRODUCER));
}

#[test]
fn two_producers_never_tear_lines() {
    let out = SharedBuffer::new();
    let sink = SharedSink::new(FaultyWriter::new(out.clone(), FaultMode::OneByteYielding));
    let mut a = LineWriter::new(sink.clone());
    let mut b = LineWriter::new(sink.clone());

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..100 {
                a.write(b"ab").unwrap();
                a.write(b"c\n").unwrap();
            }
        });
        scope.spawn(|| {
            for _ in 0..100 {
                b.write(b"12").unwrap();
                b.write(b"3\n").unwrap();
            }
        });
    });

    let lines = out.lines();
    assert_eq!(lines.len(), 200);
    assert_eq!(lines.iter().filter(|l| *l == "abc").count(), 100);
    assert_eq!(lines.iter().filter(|l| *l == "123").count(), 100);
}

#[test]
fn many_producers_with_random_fragments() {
    let out = SharedBuffer::new();
    let group = WriterGroup::new(FaultyWriter::new(out.clone(), FaultMode::OneByteYielding));

    thread::scope(|scope| {
        for producer in 0..PRODUCERS {
            let mut writer = group.create_writer();
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(0x005E_ED42 + producer as u64);
                for seq in 0..LINES_PER_PRODUCER {
                    write_fragmented(&mut writer, &expected_line(producer, seq), &mut rng);
                }
            });
        }
    });

    group.close().unwrap();
    assert_untorn(&out.lines());
}

#[test]
fn writers_created_concurrently_share_the_group() {
    let out = SharedBuffer::new();
    let group = WriterGroup::new(out.clone());

    thread::scope(|scope| {
        for producer in 0..PRODUCERS {
            let group = &group;
            scope.spawn(move || {
                let mut writer = group.create_writer();
                for seq in 0..LINES_PER_PRODUCER {
                    let line = expected_line(producer, seq);
                    let (head, tail) = line.split_at(line.len() / 2);
                    write!(writer, "{head}").unwrap();
                    writeln!(writer, "{tail}").unwrap();
                }
            });
        }
    });

    assert_eq!(group.len(), PRODUCERS);
    group.close().unwrap();
    assert_untorn(&out.lines());
}

#[test]
fn unterminated_tails_are_flushed_by_group_close() {
    let out = SharedBuffer::new();
    let group = WriterGroup::new(out.clone());

    thread::scope(|scope| {
        for producer in 0..4 {
            let mut writer = group.create_writer();
            scope.spawn(move || {
                write!(writer, "tail-{producer}").unwrap();
            });
        }
    });

    group.close().unwrap();
    let mut lines = out.lines();
    lines.sort();
    assert_eq!(lines, vec!["tail-0", "tail-1", "tail-2", "tail-3"]);
}

#[test]
fn file_backed_group() {
    let temp_file = NamedTempFile::new().unwrap();
    let file = fs::OpenOptions::new()
        .append(true)
        .open(temp_file.path())
        .unwrap();
    let group = WriterGroup::new(std::io::BufWriter::new(file));

    thread::scope(|scope| {
        for producer in 0..PRODUCERS {
            let mut writer = group.create_writer();
            scope.spawn(move || {
                let mut rng = StdRng::seed_from_u64(producer as u64);
                for seq in 0..LINES_PER_PRODUCER {
                    write_fragmented(&mut writer, &expected_line(producer, seq), &mut rng);
                }
            });
        }
    });
    group.close().unwrap();

    let text = fs::read_to_string(temp_file.path()).unwrap();
    let lines: Vec<String> = text.lines().map(str::to_owned).collect();
    assert_untorn(&lines);
}

#[test]
fn shutdown_waits_for_in_flight_write() {
    let out = SharedBuffer::new();
    let (started, in_flight) = mpsc::channel();
    let slow = FaultyWriter::new(
        out.clone(),
        FaultMode::Slow {
            started,
            per_byte: Duration::from_millis(1),
        },
    );
    let sink = SharedSink::new(slow);
    let mut writer = LineWriter::new(sink.clone());
    let line = "a line that takes a while to reach the destination\n";

    thread::scope(|scope| {
        let producer = scope.spawn(|| writer.write(line.as_bytes()));
        in_flight.recv().unwrap();
        sink.shutdown().unwrap();
        // Shutdown returned, so the write it waited for is complete.
        assert_eq!(out.text(), line);
        producer.join().unwrap().unwrap();
    });

    let err = writer.write(b"later\n").unwrap_err();
    assert!(matches!(
        err,
        Error::Flush { consumed: 5, ref source } if matches!(**source, Error::SinkClosed)
    ));
    assert_eq!(out.text(), line);
}

#[test]
fn group_close_waits_for_in_flight_write() {
    let out = SharedBuffer::new();
    let (started, in_flight) = mpsc::channel();
    let slow = FaultyWriter::new(
        out.clone(),
        FaultMode::Slow {
            started,
            per_byte: Duration::from_millis(1),
        },
    );
    let group = WriterGroup::new(slow);
    let sink = group.sink().clone();
    let mut writer = group.create_writer();
    let line = "written while the group closes\n";

    let mut writer = thread::scope(|scope| {
        let producer = scope.spawn(move || {
            writer.write(line.as_bytes()).unwrap();
            writer
        });
        in_flight.recv().unwrap();
        group.close().unwrap();
        assert_eq!(out.text(), line);
        producer.join().unwrap()
    });

    assert!(matches!(writer.write(b"late\n"), Err(Error::WriterClosed)));
    assert!(matches!(sink.write_atomic(b"late\n"), Err(Error::SinkClosed)));
}
