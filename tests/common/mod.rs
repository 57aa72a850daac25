//! Shared fixtures: build gzip tar bytes and drain channels.
#![allow(dead_code)]

use crossbeam_channel::Receiver;
use flate2::Compression;
use flate2::write::GzEncoder;
use tarbridge::Message;

/// gzip(tar) with one regular entry per `(name, body)`, no PAX attributes.
pub fn tgz(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut tar = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, body) in entries {
        let mut header = tar::Header::new_ustar();
        header.set_path(name).unwrap();
        header.set_size(body.len() as u64);
        header.set_mode(0o600);
        header.set_cksum();
        tar.append(&header, body.as_bytes()).unwrap();
    }
    tar.into_inner().unwrap().finish().unwrap()
}

/// Everything currently queued on a closed channel.
pub fn collect(rx: &Receiver<Message>) -> Vec<Message> {
    rx.try_iter().collect()
}

pub fn bodies(messages: &[Message]) -> Vec<String> {
    messages
        .iter()
        .map(|m| String::from_utf8_lossy(&m.body).into_owned())
        .collect()
}
