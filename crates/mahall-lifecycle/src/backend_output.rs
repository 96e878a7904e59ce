use std::{
    io::{BufRead, BufReader, Read},
    process::Child,
    thread,
};

use crate::app_constants::BACKEND_READY_MARKERS;

pub fn contains_ready_marker(line: &str) -> bool {
    BACKEND_READY_MARKERS
        .iter()
        .any(|marker| line.contains(marker))
}

pub(crate) type OutputStream = Box<dyn Read + Send>;

/// Detaches the child's piped stdout and stderr, tagged by stream name.
pub(crate) fn take_output_streams(child: &mut Child) -> [(&'static str, Option<OutputStream>); 2] {
    [
        (
            "stdout",
            child
                .stdout
                .take()
                .map(|out| Box::new(out) as OutputStream),
        ),
        (
            "stderr",
            child
                .stderr
                .take()
                .map(|err| Box::new(err) as OutputStream),
        ),
    ]
}

/// Reads `reader` line by line on a background thread until EOF. Invalid
/// UTF-8 is replaced rather than ending the stream.
pub(crate) fn spawn_line_reader<R, F>(
    thread_name: String,
    reader: R,
    mut on_line: F,
) -> std::io::Result<thread::JoinHandle<()>>
where
    R: Read + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    thread::Builder::new().name(thread_name).spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buffer);
                    let line = line.trim_end_matches(['\r', '\n']);
                    if !line.is_empty() {
                        on_line(line);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::{
        io::Cursor,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[test]
    fn contains_ready_marker_matches_either_marker() {
        assert!(contains_ready_marker(
            "Starting development server at http://127.0.0.1:8000/"
        ));
        assert!(contains_ready_marker("Quit the server with CTRL-BREAK."));
        assert!(!contains_ready_marker("Performing system checks..."));
    }

    #[test]
    fn spawn_line_reader_splits_lines_and_survives_invalid_utf8() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        let input = b"first\r\n\xffsecond\n\nthird".to_vec();

        spawn_line_reader("test-reader".to_string(), Cursor::new(input), move |line| {
            sink.lock().expect("lock").push(line.to_string());
        })
        .expect("spawn reader")
        .join()
        .expect("join reader");

        let lines = lines.lock().expect("lock");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "first");
        assert!(lines[1].ends_with("second"));
        assert_eq!(lines[2], "third");
    }
}
