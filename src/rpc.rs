use std::io;

use bytes::{Buf, BufMut, BytesMut};
use crypto::digest::Digest;
use crypto::md5::Md5;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::{debug, trace, warn};

use crate::constants;
use crate::errors::{self, ErrorKind};
use crate::state;
use crate::util;

/// Splits the byte stream into messages at the GUI RPC terminator.
///
/// Frames are handed out unparsed so that a malformed document costs one
/// message, not the whole connection.
pub struct RpcCodec;

impl RpcCodec {
    fn terminator(&self) -> u8 {
        constants::RPC_TERMINATOR
    }
}

impl Decoder for RpcCodec {
    type Item = BytesMut;
    type Error = errors::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> errors::Result<Option<BytesMut>> {
        match buf.iter().position(|&b| b == self.terminator()) {
            Some(i) => {
                let msg = buf.split_to(i);
                buf.advance(1);
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> errors::Result<Option<BytesMut>> {
        match self.decode(buf)? {
            Some(msg) => Ok(Some(msg)),
            None if buf.is_empty() => Ok(None),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed in the middle of a message",
            )
            .into()),
        }
    }
}

impl Encoder<treexml::Element> for RpcCodec {
    type Error = errors::Error;

    fn encode(&mut self, v: treexml::Element, buf: &mut BytesMut) -> errors::Result<()> {
        let s = format!("{}", v);
        trace!(xml = %s, "rpc send");
        buf.reserve(s.len() + 1);
        buf.extend_from_slice(s.as_bytes());
        buf.put_u8(self.terminator());
        Ok(())
    }
}

/// Parses one received message into its root element.
pub fn parse_document(msg: &[u8]) -> errors::Result<treexml::Element> {
    trace!(xml = %String::from_utf8_lossy(msg), "rpc recv");
    let doc = treexml::Document::parse(msg)
        .map_err(|e| ErrorKind::DataParseError(format!("malformed reply: {}", e)))?;
    match doc.root {
        Some(root) => Ok(root),
        None => Err(ErrorKind::DataParseError("empty reply".into()).into()),
    }
}

/// Wraps a request body into `<boinc_gui_rpc_request>`.
pub fn request(body: treexml::Element) -> treexml::Element {
    util::make_tree_element("boinc_gui_rpc_request", vec![body])
}

/// Hex MD5 of the nonce followed by the password, as the client expects in `auth2`.
pub fn salted_hash(nonce: &str, password: &str) -> String {
    let input = format!("{}{}", nonce, password);
    let mut hasher = Md5::new();
    hasher.input_str(&input);
    hasher.result_str()
}

#[derive(Clone, Debug, PartialEq)]
pub enum AuthState {
    Idle,
    AuthRequested,
    NonceReceived(String),
    HashSent,
    Authenticated,
    Failed,
}

/// Client side of the `auth1`/`auth2` exchange.
pub struct Handshake<'a> {
    password: &'a str,
    state: AuthState,
}

impl<'a> Handshake<'a> {
    pub fn new(password: &'a str) -> Handshake<'a> {
        Handshake {
            password,
            state: AuthState::Idle,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Steps until authenticated. Any error leaves the handshake in `Failed`.
    pub async fn run<T>(&mut self, channel: &mut RpcChannel<T>) -> errors::Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        while self.state != AuthState::Authenticated {
            if let Err(e) = self.step(channel).await {
                self.state = AuthState::Failed;
                return Err(e);
            }
        }
        Ok(())
    }

    async fn step<T>(&mut self, channel: &mut RpcChannel<T>) -> errors::Result<()>
    where
        T: AsyncRead + AsyncWrite + Unpin,
    {
        let next = match &self.state {
            AuthState::Idle => {
                channel.send(request(treexml::Element::new("auth1"))).await?;
                AuthState::AuthRequested
            }
            AuthState::AuthRequested => {
                let reply = channel.receive().await?;
                let nonce = util::find_child(&reply, "nonce")
                    .map(util::node_text)
                    .ok_or_else(|| ErrorKind::ProtocolError("no nonce in auth1 reply".into()))?;
                AuthState::NonceReceived(nonce.to_string())
            }
            AuthState::NonceReceived(nonce) => {
                let auth2 = util::make_tree_element(
                    "auth2",
                    vec![util::make_text_element(
                        "nonce_hash",
                        salted_hash(nonce, self.password),
                    )],
                );
                channel.send(request(auth2)).await?;
                AuthState::HashSent
            }
            AuthState::HashSent => {
                // The acknowledgement carries no status code we can rely on.
                // Only an explicit <unauthorized/> counts as a rejection.
                match channel.receive().await {
                    Ok(reply) => {
                        if util::find_child(&reply, "unauthorized").is_some() {
                            return Err(ErrorKind::AuthError("password rejected".into()).into());
                        }
                    }
                    Err(errors::Error(ErrorKind::DataParseError(what), _)) => {
                        warn!(error = %what, "unreadable auth2 reply, assuming authorized");
                    }
                    Err(e) => return Err(e),
                }
                AuthState::Authenticated
            }
            AuthState::Authenticated => AuthState::Authenticated,
            AuthState::Failed => {
                return Err(ErrorKind::AuthError("handshake already failed".into()).into())
            }
        };
        self.state = next;
        Ok(())
    }
}

/// One GUI RPC connection.
pub struct RpcChannel<T> {
    framed: Framed<T, RpcCodec>,
}

impl RpcChannel<TcpStream> {
    pub async fn open(addr: &str) -> errors::Result<RpcChannel<TcpStream>> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ErrorKind::ConnectError(addr.into(), e.to_string()))?;
        Ok(RpcChannel::new(stream))
    }
}

impl<T> RpcChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: T) -> RpcChannel<T> {
        RpcChannel {
            framed: Framed::new(io, RpcCodec),
        }
    }

    pub async fn send(&mut self, msg: treexml::Element) -> errors::Result<()> {
        self.framed.send(msg).await
    }

    pub async fn receive(&mut self) -> errors::Result<treexml::Element> {
        match self.framed.next().await {
            Some(msg) => parse_document(&msg?),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before reply",
            )
            .into()),
        }
    }

    pub async fn close(mut self) -> errors::Result<()> {
        SinkExt::<treexml::Element>::close(&mut self.framed).await
    }

    pub async fn authorize(&mut self, password: &str) -> errors::Result<()> {
        let mut handshake = Handshake::new(password);
        let result = handshake.run(self).await;
        debug!(state = ?handshake.state(), "handshake finished");
        result
    }

    pub async fn get_state(&mut self) -> errors::Result<state::ClientState> {
        self.send(request(treexml::Element::new("get_state"))).await?;
        let reply = self.receive().await?;
        state::ClientState::from_reply(&reply)
    }
}
