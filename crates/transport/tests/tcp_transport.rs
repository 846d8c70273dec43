//! Integration tests for DBGp framing over a real TCP socket.

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use transport::testing::{frame_payload, frame_payloads};
use transport::{CodecError, DbgpCodec, DbgpReader, split};

async fn connected_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (engine, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
    (accepted.unwrap().0, engine.unwrap())
}

#[tokio::test]
async fn test_init_then_response_over_tcp() {
    let (ide, mut engine) = connected_pair().await;
    let (mut reader, mut writer) = split(ide);

    engine
        .write_all(&frame_payload(r#"<init fileuri="file:///srv/index.php"></init>"#))
        .await
        .unwrap();
    let init = reader.next().await.unwrap().unwrap();
    assert!(init.starts_with(b"<init"));

    writer.send("status -i 1\0").await.unwrap();
    let mut command = [0u8; 12];
    engine.read_exact(&mut command).await.unwrap();
    assert_eq!(&command, b"status -i 1\0");

    engine
        .write_all(&frame_payload(
            r#"<response command="status" transaction_id="1" status="break"></response>"#,
        ))
        .await
        .unwrap();
    let response = reader.next().await.unwrap().unwrap();
    assert!(response.ends_with(b"</response>"));
}

#[tokio::test]
async fn test_frames_split_across_writes() {
    let (ide, mut engine) = connected_pair().await;
    let (mut reader, _writer) = split(ide);

    let bytes = frame_payloads(&["<a/>", "<response></response>"]);
    let (head, tail) = bytes.split_at(7);

    engine.write_all(head).await.unwrap();
    engine.flush().await.unwrap();
    engine.write_all(tail).await.unwrap();

    assert_eq!(&reader.next().await.unwrap().unwrap()[..], b"<a/>");
    assert_eq!(
        &reader.next().await.unwrap().unwrap()[..],
        b"<response></response>"
    );
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
    let (ide, mut engine) = connected_pair().await;
    let mut reader = DbgpReader::with_codec(ide, DbgpCodec::with_max_size(8));

    engine
        .write_all(&frame_payload("<response></response>"))
        .await
        .unwrap();

    let err = reader.next().await.unwrap().unwrap_err();
    assert!(matches!(err, CodecError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn test_engine_hangup_ends_stream() {
    let (ide, engine) = connected_pair().await;
    let (mut reader, _writer) = split(ide);

    drop(engine);

    assert!(reader.next().await.is_none());
}
