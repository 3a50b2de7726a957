// Newline-delimited JSON streaming utilities
use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use futures::StreamExt;
use serde::Serialize;

/// Create a chunked NDJSON streaming response: one JSON object per line,
/// flushed as items arrive so the renderer can draw progressively.
pub fn ndjson_stream<S, T>(stream: S) -> axum::response::Response
where
    S: Stream<Item = T> + Send + 'static,
    T: Serialize,
{
    let byte_stream = stream.map(|item| serialize_line(&item));
    let body = Body::from_stream(byte_stream);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::TRANSFER_ENCODING, "chunked")
        .body(body);

    match response {
        Ok(response) => response.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn serialize_line<T: Serialize>(item: &T) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(item)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');
    Ok(line.freeze())
}
