//! Wire-level streaming tests
//!
//! Frames are synthesized byte-exactly with the protocol encoder and
//! pushed through the parser, the queues and a live TCP client.

use std::io::Write;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

use slicelink::protocol::header::Timestamp;
use slicelink::protocol::message::encode_frame_at;
use slicelink::protocol::types::image::ScalarType;
use slicelink::protocol::types::{ImageMessage, ProbeType, UsStatusMessage};
use slicelink::stream::{
    ClientConfig, ConnectionState, FrameParser, FrameQueue, IncomingFrame, VideoStreamClient,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn image_frame(device: &str, seconds: u32, fill: u8) -> Vec<u8> {
    let msg = ImageMessage::new(ScalarType::Uint8, [32, 24, 1], vec![fill; 32 * 24])
        .unwrap()
        .with_spacing([0.3, 0.3, 1.0]);
    encode_frame_at(&msg, device, Timestamp::new(seconds, 0)).unwrap()
}

fn status_frame(device: &str) -> Vec<u8> {
    let msg = UsStatusMessage {
        probe_type: ProbeType::Sector,
        origin: [160.0, 0.0, 0.0],
        depth_start: 10.0,
        depth_end: 120.0,
        width: 0.9,
    };
    encode_frame_at(&msg, device, Timestamp::new(50, 0)).unwrap()
}

fn parse_all(parser: &mut FrameParser) -> Vec<IncomingFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = parser.next_frame().unwrap() {
        frames.push(frame);
    }
    frames
}

#[test]
fn test_framing_identical_across_chunk_sizes() {
    let wire = image_frame("Sonix[BGR]", 123, 0x5A);

    let mut reference = None;
    for chunk_size in [1usize, 2, 5, 7, 64, wire.len()] {
        let mut parser = FrameParser::new();
        let mut frames = Vec::new();
        for chunk in wire.chunks(chunk_size) {
            parser.feed(chunk);
            frames.extend(parse_all(&mut parser));
        }

        assert_eq!(frames.len(), 1, "chunk size {chunk_size}");
        match &frames[0] {
            IncomingFrame::Image(meta, msg) => {
                assert_eq!(meta.device_name, "Sonix[BGR]");
                assert_eq!(meta.timestamp, 123.0);
                assert_eq!(msg.size, [32, 24, 1]);
                assert_eq!(msg.data, vec![0x5A; 32 * 24]);
            }
            other => panic!("unexpected frame: {other:?}"),
        }

        match &reference {
            None => reference = Some(frames.remove(0)),
            Some(expected) => assert_eq!(&frames[0], expected, "chunk size {chunk_size}"),
        }
    }
}

#[test]
fn test_mixed_stream_decodes_in_order() {
    let mut wire = Vec::new();
    wire.extend_from_slice(&image_frame("Sonix", 1, 1));
    wire.extend_from_slice(&status_frame("Sonix"));
    wire.extend_from_slice(&image_frame("Sonix", 2, 2));

    let mut parser = FrameParser::new();
    parser.feed(&wire);
    let frames = parse_all(&mut parser);

    assert_eq!(frames.len(), 3);
    assert!(matches!(frames[0], IncomingFrame::Image(_, _)));
    assert!(matches!(frames[1], IncomingFrame::ProbeStatus(_, _)));
    assert!(matches!(frames[2], IncomingFrame::Image(_, _)));
}

#[test]
fn test_queue_fifo_under_stress() {
    const FRAMES: u64 = 2000;
    let queue = Arc::new(FrameQueue::new(FRAMES as usize));
    let producer_queue = queue.clone();

    let producer = std::thread::spawn(move || {
        for i in 0..FRAMES {
            producer_queue.push(i);
            if i % 64 == 0 {
                std::thread::yield_now();
            }
        }
    });

    let consumer = std::thread::spawn(move || {
        let mut received = Vec::with_capacity(FRAMES as usize);
        let deadline = Instant::now() + Duration::from_secs(30);
        while received.len() < FRAMES as usize {
            assert!(Instant::now() < deadline, "consumer starved");
            match queue.pop() {
                Some(v) => received.push(v),
                None => std::thread::yield_now(),
            }
        }
        received
    });

    producer.join().unwrap();
    let received = consumer.join().unwrap();

    // strict FIFO: what went in as 0..N comes out as 0..N
    let expected: Vec<u64> = (0..FRAMES).collect();
    assert_eq!(received, expected);
}

#[test]
fn test_client_receives_over_tcp() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = std::thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        // a foreign type first: the client must skip it cleanly
        struct Opaque;
        impl slicelink::protocol::message::MessageBody for Opaque {
            const TYPE_NAME: &'static str = "TRANSFORM";
            fn encode_body(&self) -> slicelink::Result<Vec<u8>> {
                Ok(vec![0u8; 48])
            }
            fn decode_body(_: &[u8]) -> slicelink::Result<Self> {
                Ok(Opaque)
            }
        }
        socket
            .write_all(&encode_frame_at(&Opaque, "Tracker", Timestamp::zero()).unwrap())
            .unwrap();

        for k in 0..3u8 {
            socket.write_all(&image_frame("Sonix[BGR]", 100 + k as u32, k)).unwrap();
        }
        socket.write_all(&status_frame("Sonix")).unwrap();
        socket.flush().unwrap();
        // keep the socket open briefly so the client drains everything
        std::thread::sleep(Duration::from_millis(300));
    });

    let mut config = ClientConfig::new(addr.to_string());
    config.read_timeout = Duration::from_millis(50);
    let mut client = VideoStreamClient::start(config).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut images = Vec::new();
    let mut statuses = Vec::new();
    while (images.len() < 3 || statuses.is_empty()) && Instant::now() < deadline {
        while let Some(frame) = client.last_image_message() {
            images.push(frame);
        }
        while let Some(frame) = client.last_probe_status() {
            statuses.push(frame);
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(images.len(), 3, "did not receive all image frames");
    assert_eq!(statuses.len(), 1);
    // FIFO across the wire
    for (k, frame) in images.iter().enumerate() {
        assert_eq!(frame.message.data[0], k as u8);
        assert_eq!(frame.device_name, "Sonix[BGR]");
    }
    // calibrated timestamps are in the local clock, not the wire clock
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs_f64();
    assert!((images[0].timestamp - now).abs() < 60.0);

    let stats = client.image_queue_stats();
    assert_eq!(stats.enqueued, 3);
    assert_eq!(stats.dequeued, 3);
    assert_eq!(stats.dropped, 0);
    assert_eq!(client.status_queue_stats().enqueued, 1);

    client.stop();
    assert_eq!(client.state(), ConnectionState::Disconnected);
    server.join().unwrap();
}

#[test]
fn test_client_survives_corrupt_frame() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = std::thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut bad = image_frame("Sonix", 1, 9);
        let last = bad.len() - 1;
        bad[last] ^= 0xFF; // body no longer matches the CRC
        socket.write_all(&bad).unwrap();
        socket.write_all(&image_frame("Sonix", 2, 7)).unwrap();
        socket.flush().unwrap();
        std::thread::sleep(Duration::from_millis(300));
    });

    let mut config = ClientConfig::new(addr.to_string());
    config.read_timeout = Duration::from_millis(50);
    let mut client = VideoStreamClient::start(config).unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut good = None;
    while good.is_none() && Instant::now() < deadline {
        good = client.last_image_message();
        std::thread::sleep(Duration::from_millis(10));
    }

    // the corrupt frame is dropped, the next one decodes normally
    let frame = good.expect("frame after the corrupt one never arrived");
    assert_eq!(frame.message.data[0], 7);
    assert!(client.last_image_message().is_none());

    client.stop();
    server.join().unwrap();
}
