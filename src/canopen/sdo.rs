//! SDO client: expedited and segmented transfers against a remote server.
//!
//! [`SdoClient`] speaks the CiA 301 SDO protocol as the client side. It
//! sends requests on a [`Bus`] handle and receives responses through a
//! [`Mux`] subscription per request/response step, so passive observers of
//! the same bus keep seeing frames while a transfer is in flight.
//!
//! Transfers auto-select their mode: payloads of up to 4 bytes travel
//! expedited inside the initiate exchange; anything larger runs the
//! segmented protocol with its alternating toggle bit.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use canlink::{LoopbackBus, Mux};
//! use canlink::canopen::{NodeId, SdoClient};
//!
//! let bus = LoopbackBus::new();
//! let tx = Arc::new(bus.open().await);
//! let mux = Arc::new(Mux::new(Arc::new(bus.open().await)));
//!
//! let mut client = SdoClient::new(tx, NodeId(0x22), mux, Duration::from_millis(500))?;
//! client.write_u16(0x2000, 0x01, 1234).await?;
//! let value = client.read_u16(0x2000, 0x01).await?;
//! ```

pub mod abort;
pub(crate) mod frames;

use std::sync::Arc;
use std::time::Duration;

use crate::bus::{Bus, Mux, Subscription};
use crate::canopen::ids::{parse_cobid, FunctionCode, NodeId};
use crate::core::error::{CanError, Result};
use crate::core::filter::FrameFilter;
use crate::core::frame::Frame;

pub use abort::{abort_frame, parse_abort, SdoAbort};
pub use frames::ExpeditedEncoding;

use frames::{
    command_specifier, download_initiate_segmented, download_segment, expedited_download,
    expedited_payload_len, index_of, segmented_size_indicated, subindex_of, toggle_bit,
    upload_request, upload_segment_data, upload_segment_request, CS_ABORT, EXPEDITED_MAX,
    SCS_DOWNLOAD_INITIATE, SCS_DOWNLOAD_SEGMENT, SCS_UPLOAD_INITIATE, SCS_UPLOAD_SEGMENT,
    SEGMENT_MAX,
};

/// A synchronous-feeling SDO client for one server node.
///
/// Requests are serialized by `&mut self`: at most one transfer is
/// outstanding per client, and each request/response step holds its own
/// short-lived [`Mux`] subscription.
///
/// `timeout` bounds every individual wait for a response; zero waits
/// indefinitely. A timeout surfaces as [`CanError::Closed`], the same
/// sentinel produced when the mux or bus shuts down mid-call.
pub struct SdoClient {
    bus: Arc<dyn Bus>,
    mux: Arc<Mux>,
    node: NodeId,
    timeout: Duration,
    encoding: ExpeditedEncoding,
}

impl SdoClient {
    /// Create a client for `node`, sending on `bus` and listening through
    /// `mux`. The mux must be reading the same underlying bus.
    pub fn new(bus: Arc<dyn Bus>, node: NodeId, mux: Arc<Mux>, timeout: Duration) -> Result<Self> {
        node.validate()?;
        Ok(SdoClient {
            bus,
            mux,
            node,
            timeout,
            encoding: ExpeditedEncoding::default(),
        })
    }

    /// Select the expedited download command-byte encoding. Responses are
    /// accepted in either encoding regardless of this setting.
    #[must_use]
    pub fn with_expedited_encoding(mut self, encoding: ExpeditedEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// The server node this client talks to.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Write `data` to the object at `index`/`subindex`.
    ///
    /// Payloads of 1..=4 bytes use an expedited transfer; larger payloads
    /// run the segmented download protocol. Empty payloads are rejected,
    /// as the expedited command byte cannot encode zero valid bytes.
    pub async fn download(&mut self, index: u16, subindex: u8, data: &[u8]) -> Result<()> {
        if data.len() <= EXPEDITED_MAX {
            self.download_expedited(index, subindex, data).await
        } else {
            self.download_segmented(index, subindex, data).await
        }
    }

    /// Read the object at `index`/`subindex`, whatever its size.
    pub async fn upload(&mut self, index: u16, subindex: u8) -> Result<Vec<u8>> {
        let request = upload_request(self.node, index, subindex)?;
        let filter = self.response_filter(move |frame| {
            let scs = command_specifier(frame);
            scs == SCS_UPLOAD_INITIATE
                || (scs == CS_ABORT && index_of(frame) == index && subindex_of(frame) == subindex)
        });
        let first = self.transact(request, filter, 2).await?;
        check_abort(&first)?;

        if index_of(&first) != index || subindex_of(&first) != subindex {
            return Err(CanError::protocol(format!(
                "upload initiate multiplexer mismatch: got {:04X}:{:02X}, want {:04X}:{:02X}",
                index_of(&first),
                subindex_of(&first),
                index,
                subindex
            )));
        }

        if let Some((len, _)) = expedited_payload_len(first.data[0]) {
            return Ok(first.data[4..4 + len].to_vec());
        }

        // Segmented: the initiate response may declare the total size.
        let declared = if segmented_size_indicated(first.data[0]) {
            Some(u32::from_le_bytes([
                first.data[4],
                first.data[5],
                first.data[6],
                first.data[7],
            ]) as usize)
        } else {
            None
        };
        self.upload_segments(declared).await
    }

    async fn download_expedited(&mut self, index: u16, subindex: u8, data: &[u8]) -> Result<()> {
        let request = expedited_download(self.node, index, subindex, data, self.encoding)?;
        let filter = self.initiate_response_filter(SCS_DOWNLOAD_INITIATE, index, subindex);
        let response = self.transact(request, filter, 1).await?;
        check_abort(&response)?;
        Ok(())
    }

    async fn download_segmented(&mut self, index: u16, subindex: u8, data: &[u8]) -> Result<()> {
        let initiate = download_initiate_segmented(self.node, index, subindex, data.len() as u32)?;
        let filter = self.initiate_response_filter(SCS_DOWNLOAD_INITIATE, index, subindex);
        let response = self.transact(initiate, filter, 1).await?;
        check_abort(&response)?;

        let mut toggle = false;
        let mut sent = 0;
        while sent < data.len() {
            let seg_len = (data.len() - sent).min(SEGMENT_MAX);
            let last = sent + seg_len == data.len();
            let segment =
                download_segment(self.node, &data[sent..sent + seg_len], toggle, last)?;
            let filter = self.segment_response_filter(SCS_DOWNLOAD_SEGMENT, toggle);
            let ack = self.transact(segment, filter, 1).await?;
            check_abort(&ack)?;
            sent += seg_len;
            toggle = !toggle;
        }
        Ok(())
    }

    async fn upload_segments(&mut self, declared: Option<usize>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(declared.unwrap_or(SEGMENT_MAX));
        let mut toggle = false;
        loop {
            let request = upload_segment_request(self.node, toggle)?;
            let filter = self.segment_response_filter(SCS_UPLOAD_SEGMENT, toggle);
            let response = self.transact(request, filter, 1).await?;
            check_abort(&response)?;

            let (bytes, last) = upload_segment_data(&response)?;
            out.extend_from_slice(bytes);
            toggle = !toggle;
            if last {
                if let Some(expected) = declared {
                    if out.len() != expected {
                        return Err(CanError::SizeMismatch {
                            expected,
                            actual: out.len(),
                        });
                    }
                }
                return Ok(out);
            }
        }
    }

    /// Subscribe, send the request, and wait for the first matching
    /// response. The subscription lives exactly as long as this one step.
    async fn transact(&self, request: Frame, filter: FrameFilter, buffer: usize) -> Result<Frame> {
        let mut sub = self.mux.subscribe(filter, buffer).await;
        if let Err(e) = self.bus.send(request).await {
            sub.cancel().await;
            return Err(e);
        }
        let outcome = self.wait(&mut sub).await;
        sub.cancel().await;
        outcome
    }

    async fn wait(&self, sub: &mut Subscription) -> Result<Frame> {
        if self.timeout.is_zero() {
            return sub.recv().await.ok_or(CanError::Closed);
        }
        match tokio::time::timeout(self.timeout, sub.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            // queue closed upstream, or the timeout elapsed
            Ok(None) | Err(_) => Err(CanError::Closed),
        }
    }

    /// Responses from our server node, 8 bytes, narrowed further by `matcher`.
    fn response_filter(
        &self,
        matcher: impl Fn(&Frame) -> bool + Send + Sync + 'static,
    ) -> FrameFilter {
        let node = self.node;
        FrameFilter::from_fn(move |frame| {
            matches!(
                parse_cobid(frame.id),
                Ok((FunctionCode::SdoTx, n)) if n == node && frame.len == 8
            ) && matcher(frame)
        })
    }

    fn initiate_response_filter(&self, scs: u8, index: u16, subindex: u8) -> FrameFilter {
        self.response_filter(move |frame| {
            let specifier = command_specifier(frame);
            (specifier == scs || specifier == CS_ABORT)
                && index_of(frame) == index
                && subindex_of(frame) == subindex
        })
    }

    fn segment_response_filter(&self, scs: u8, toggle: bool) -> FrameFilter {
        self.response_filter(move |frame| {
            let specifier = command_specifier(frame);
            (specifier == scs && toggle_bit(frame) == toggle) || specifier == CS_ABORT
        })
    }

    // ------------------------------------------------------------------
    // Typed helpers (little-endian, per CANopen data encoding)
    // ------------------------------------------------------------------

    /// Write a u8 value.
    pub async fn write_u8(&mut self, index: u16, subindex: u8, value: u8) -> Result<()> {
        self.download(index, subindex, &[value]).await
    }

    /// Write a u16 value.
    pub async fn write_u16(&mut self, index: u16, subindex: u8, value: u16) -> Result<()> {
        self.download(index, subindex, &value.to_le_bytes()).await
    }

    /// Write a u32 value.
    pub async fn write_u32(&mut self, index: u16, subindex: u8, value: u32) -> Result<()> {
        self.download(index, subindex, &value.to_le_bytes()).await
    }

    /// Read a u8 value, checking the returned length.
    pub async fn read_u8(&mut self, index: u16, subindex: u8) -> Result<u8> {
        let data = self.upload(index, subindex).await?;
        expect_len(&data, 1)?;
        Ok(data[0])
    }

    /// Read a u16 value, checking the returned length.
    pub async fn read_u16(&mut self, index: u16, subindex: u8) -> Result<u16> {
        let data = self.upload(index, subindex).await?;
        expect_len(&data, 2)?;
        Ok(u16::from_le_bytes([data[0], data[1]]))
    }

    /// Read a u32 value, checking the returned length.
    pub async fn read_u32(&mut self, index: u16, subindex: u8) -> Result<u32> {
        let data = self.upload(index, subindex).await?;
        expect_len(&data, 4)?;
        Ok(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
    }
}

fn expect_len(data: &[u8], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(CanError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn check_abort(frame: &Frame) -> Result<()> {
    if let Some((_, abort)) = parse_abort(frame) {
        return Err(CanError::Abort(abort));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::bus::loopback::LoopbackBus;
    use crate::canopen::ids::cobid;

    const NODE: NodeId = NodeId(0x22);
    const TIMEOUT: Duration = Duration::from_millis(500);

    fn response_frame(node: NodeId, data: [u8; 8]) -> Frame {
        Frame {
            id: cobid(FunctionCode::SdoTx, node),
            extended: false,
            rtr: false,
            len: 8,
            data,
        }
    }

    /// Harness: a loopback bus with a client wired through a mux and a
    /// server task driven by `handler` for every SDO request it receives.
    async fn client_with_server<H>(handler: H) -> (SdoClient, Arc<Mux>)
    where
        H: FnMut(Frame) -> Vec<Frame> + Send + 'static,
    {
        let bus = LoopbackBus::new();
        let tx = Arc::new(bus.open().await);
        let mux = Arc::new(Mux::new(Arc::new(bus.open().await)));

        let server = bus.open().await;
        let mut handler = handler;
        tokio::spawn(async move {
            loop {
                let frame = match server.recv().await {
                    Ok(frame) => frame,
                    Err(_) => return,
                };
                if !matches!(
                    parse_cobid(frame.id),
                    Ok((FunctionCode::SdoRx, n)) if n == NODE
                ) {
                    continue;
                }
                for response in handler(frame) {
                    if server.send(response).await.is_err() {
                        return;
                    }
                }
            }
        });

        let client = SdoClient::new(tx, NODE, Arc::clone(&mux), TIMEOUT).unwrap();
        (client, mux)
    }

    /// Server behavior: acknowledge downloads, serve `stored` on upload.
    fn echo_server(stored: Vec<u8>) -> impl FnMut(Frame) -> Vec<Frame> + Send + 'static {
        move |frame: Frame| {
            let mut data = [0u8; 8];
            match frame.data[0] >> 5 {
                frames::CCS_DOWNLOAD_INITIATE => {
                    data[0] = SCS_DOWNLOAD_INITIATE << 5;
                    data[1..4].copy_from_slice(&frame.data[1..4]);
                    vec![response_frame(NODE, data)]
                }
                frames::CCS_UPLOAD_INITIATE => {
                    // expedited, sized layout
                    let n = (4 - stored.len()) as u8;
                    data[0] = (SCS_UPLOAD_INITIATE << 5) | 1 << 3 | 1 << 2 | (n & 0x3);
                    data[1..4].copy_from_slice(&frame.data[1..4]);
                    data[4..4 + stored.len()].copy_from_slice(&stored);
                    vec![response_frame(NODE, data)]
                }
                _ => vec![],
            }
        }
    }

    #[tokio::test]
    async fn test_expedited_download_all_lengths() {
        let (mut client, _mux) = client_with_server(echo_server(vec![0x01])).await;
        for len in 1..=4usize {
            client
                .download(0x2000, 0x01, &[0xAB; 4][..len])
                .await
                .unwrap();
        }
        // zero-byte payloads are outside the expedited protocol
        let err = client.download(0x2000, 0x01, &[]).await.unwrap_err();
        assert!(matches!(err, CanError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_expedited_download_legacy_encoding() {
        let (client, _mux) = client_with_server(echo_server(vec![])).await;
        let mut client = client.with_expedited_encoding(ExpeditedEncoding::Legacy);
        client
            .download(0x2000, 0x01, &[0xDE, 0xAD, 0xBE, 0xEF])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_expedited_upload() {
        let (mut client, _mux) = client_with_server(echo_server(vec![0x01, 0x02, 0x03])).await;
        let data = client.upload(0x2000, 0x01).await.unwrap();
        assert_eq!(data, vec![0x01, 0x02, 0x03]);
    }

    #[tokio::test]
    async fn test_expedited_upload_legacy_server() {
        // server answers with the legacy command-byte layout: 3 bytes -> 0x47
        let (mut client, _mux) = client_with_server(|frame: Frame| {
            if frame.data[0] >> 5 != frames::CCS_UPLOAD_INITIATE {
                return vec![];
            }
            let mut data = [0u8; 8];
            data[0] = 0x47;
            data[1..4].copy_from_slice(&frame.data[1..4]);
            data[4..7].copy_from_slice(&[0xDE, 0xAD, 0xBE]);
            vec![response_frame(NODE, data)]
        })
        .await;
        let data = client.upload(0x2000, 0x01).await.unwrap();
        assert_eq!(data, vec![0xDE, 0xAD, 0xBE]);
    }

    #[tokio::test]
    async fn test_segmented_download() {
        // 11 bytes: two segments of 7 and 4, toggles 0 then 1, final
        // segment c=1 n=3
        let payload: Vec<u8> = (1..=11).collect();
        let received = Arc::new(Mutex::new(Vec::new()));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let received_in = Arc::clone(&received);
        let commands_in = Arc::clone(&commands);
        let (mut client, _mux) = client_with_server(move |frame: Frame| {
            let mut data = [0u8; 8];
            match frame.data[0] >> 5 {
                frames::CCS_DOWNLOAD_INITIATE => {
                    data[0] = SCS_DOWNLOAD_INITIATE << 5;
                    data[1..4].copy_from_slice(&frame.data[1..4]);
                    vec![response_frame(NODE, data)]
                }
                frames::CCS_DOWNLOAD_SEGMENT => {
                    let cmd = frame.data[0];
                    commands_in.lock().unwrap().push(cmd);
                    let last = cmd & 1 != 0;
                    let unused = if last { ((cmd >> 1) & 0x7) as usize } else { 0 };
                    received_in
                        .lock()
                        .unwrap()
                        .extend_from_slice(&frame.data[1..8 - unused]);
                    data[0] = (SCS_DOWNLOAD_SEGMENT << 5) | (cmd & 0x10);
                    vec![response_frame(NODE, data)]
                }
                _ => vec![],
            }
        })
        .await;

        client.download(0x3000, 0x02, &payload).await.unwrap();

        assert_eq!(*received.lock().unwrap(), payload);
        let commands = commands.lock().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], 0x00); // toggle 0, c=0
        assert_eq!(commands[1], 0x10 | (3 << 1) | 1); // toggle 1, n=3, c=1
    }

    #[tokio::test]
    async fn test_segmented_upload() {
        // 12 bytes: initiate declares the size, then segments of 7 and 5;
        // the final segment carries c=1 n=2
        let stored: Vec<u8> = (0..12).map(|i| 0xF0 | i as u8).collect();
        let stored_in = stored.clone();
        let (mut client, _mux) = client_with_server(move |frame: Frame| {
            let mut data = [0u8; 8];
            match frame.data[0] >> 5 {
                frames::CCS_UPLOAD_INITIATE => {
                    data[0] = (SCS_UPLOAD_INITIATE << 5) | 1 << 2; // e=0, s=1
                    data[1..4].copy_from_slice(&frame.data[1..4]);
                    data[4..8].copy_from_slice(&(stored_in.len() as u32).to_le_bytes());
                    vec![response_frame(NODE, data)]
                }
                frames::CCS_UPLOAD_SEGMENT => {
                    let toggle = frame.data[0] & 0x10;
                    let (chunk, last) = if toggle == 0 {
                        (&stored_in[..7], false)
                    } else {
                        (&stored_in[7..], true)
                    };
                    data[0] = (SCS_UPLOAD_SEGMENT << 5) | toggle;
                    if last {
                        let n = (7 - chunk.len()) as u8;
                        data[0] |= (n << 1) | 1;
                    }
                    data[1..1 + chunk.len()].copy_from_slice(chunk);
                    vec![response_frame(NODE, data)]
                }
                _ => vec![],
            }
        })
        .await;

        let data = client.upload(0x3000, 0x02).await.unwrap();
        assert_eq!(data, stored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_segmented_upload_size_mismatch() {
        // initiate declares 20 bytes but the server stops after 12
        let stored: Vec<u8> = (0..12).collect();
        let stored_in = stored.clone();
        let (mut client, _mux) = client_with_server(move |frame: Frame| {
            let mut data = [0u8; 8];
            match frame.data[0] >> 5 {
                frames::CCS_UPLOAD_INITIATE => {
                    data[0] = (SCS_UPLOAD_INITIATE << 5) | 1 << 2;
                    data[1..4].copy_from_slice(&frame.data[1..4]);
                    data[4..8].copy_from_slice(&20u32.to_le_bytes());
                    vec![response_frame(NODE, data)]
                }
                frames::CCS_UPLOAD_SEGMENT => {
                    let toggle = frame.data[0] & 0x10;
                    let (chunk, last) = if toggle == 0 {
                        (&stored_in[..7], false)
                    } else {
                        (&stored_in[7..], true)
                    };
                    data[0] = (SCS_UPLOAD_SEGMENT << 5) | toggle;
                    if last {
                        data[0] |= (((7 - chunk.len()) as u8) << 1) | 1;
                    }
                    data[1..1 + chunk.len()].copy_from_slice(chunk);
                    vec![response_frame(NODE, data)]
                }
                _ => vec![],
            }
        })
        .await;

        let err = client.upload(0x3000, 0x02).await.unwrap_err();
        assert!(matches!(
            err,
            CanError::SizeMismatch {
                expected: 20,
                actual: 12
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_toggle_times_out_as_closed() {
        // server answers the first upload segment with the wrong toggle
        let (mut client, _mux) = client_with_server(move |frame: Frame| {
            let mut data = [0u8; 8];
            match frame.data[0] >> 5 {
                frames::CCS_UPLOAD_INITIATE => {
                    data[0] = (SCS_UPLOAD_INITIATE << 5) | 1 << 2;
                    data[1..4].copy_from_slice(&frame.data[1..4]);
                    data[4..8].copy_from_slice(&8u32.to_le_bytes());
                    vec![response_frame(NODE, data)]
                }
                frames::CCS_UPLOAD_SEGMENT => {
                    // always toggle 1, never matching the first request
                    data[0] = (SCS_UPLOAD_SEGMENT << 5) | 0x10;
                    vec![response_frame(NODE, data)]
                }
                _ => vec![],
            }
        })
        .await;

        let err = client.upload(0x3000, 0x02).await.unwrap_err();
        assert!(matches!(err, CanError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out_as_closed() {
        let (mut client, _mux) = client_with_server(|_| vec![]).await;
        let err = client.download(0x2000, 0x01, &[0xAA]).await.unwrap_err();
        assert!(matches!(err, CanError::Closed));
    }

    #[tokio::test]
    async fn test_abort_surfaces_with_code_and_description() {
        let (mut client, _mux) = client_with_server(move |frame: Frame| {
            if frame.data[0] >> 5 == frames::CCS_UPLOAD_INITIATE {
                let index = u16::from_le_bytes([frame.data[1], frame.data[2]]);
                vec![abort_frame(NODE, index, frame.data[3], 0x0602_0000).unwrap()]
            } else {
                vec![]
            }
        })
        .await;

        let err = client.upload(0x2000, 0x01).await.unwrap_err();
        match err {
            CanError::Abort(abort) => {
                assert_eq!(abort.index, 0x2000);
                assert_eq!(abort.subindex, 0x01);
                assert_eq!(abort.code, 0x0602_0000);
                assert!(abort.to_string().contains("object does not exist"));
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_abort_during_download() {
        let (mut client, _mux) = client_with_server(move |frame: Frame| {
            if frame.data[0] >> 5 == frames::CCS_DOWNLOAD_INITIATE {
                let index = u16::from_le_bytes([frame.data[1], frame.data[2]]);
                vec![abort_frame(NODE, index, frame.data[3], 0x0601_0002).unwrap()]
            } else {
                vec![]
            }
        })
        .await;

        let err = client.download(0x1017, 0x00, &[0x10, 0x27]).await.unwrap_err();
        assert!(matches!(err, CanError::Abort(a) if a.code == 0x0601_0002));
    }

    #[tokio::test]
    async fn test_typed_helpers() {
        let (mut client, _mux) = client_with_server(echo_server(vec![0x34, 0x12])).await;
        client.write_u8(0x2000, 0x01, 0xAB).await.unwrap();
        client.write_u16(0x2000, 0x01, 0xBEEF).await.unwrap();
        client.write_u32(0x2000, 0x01, 0xDEAD_BEEF).await.unwrap();

        assert_eq!(client.read_u16(0x2000, 0x01).await.unwrap(), 0x1234);

        // length mismatch caught by the typed read
        let err = client.read_u32(0x2000, 0x01).await.unwrap_err();
        assert!(matches!(
            err,
            CanError::SizeMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_bystander_subscriber_sees_sdo_traffic() {
        let (mut client, mux) = client_with_server(echo_server(vec![0x01])).await;
        let mut observer = mux
            .subscribe(FrameFilter::id(cobid(FunctionCode::SdoTx, NODE)), 8)
            .await;

        client.download(0x2000, 0x01, &[0x55]).await.unwrap();

        // the observer saw the server's response even though the SDO call
        // consumed it through its own subscription
        let seen = tokio::time::timeout(Duration::from_millis(500), observer.recv())
            .await
            .expect("mux did not fan out")
            .expect("subscription closed");
        assert_eq!(seen.id, cobid(FunctionCode::SdoTx, NODE));
    }

    #[tokio::test]
    async fn test_client_rejects_invalid_node() {
        let bus = LoopbackBus::new();
        let tx = Arc::new(bus.open().await);
        let mux = Arc::new(Mux::new(Arc::new(bus.open().await)));
        assert!(SdoClient::new(tx, NodeId(0), mux, TIMEOUT).is_err());
    }
}
