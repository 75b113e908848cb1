//! Wire encodings of the connectivity types.
//!
//! Field order is fixed and enum variants travel by name, so payloads stay
//! readable across versions: a peer running newer code can add variants
//! without shifting any field, and an older decoder rejects what it does not
//! know instead of guessing.

use bytes::{Buf, BufMut};

use super::types::{
    ClusterState, ConnectionStatus, HeartbeatTimestamp, NodeConnectivity, NodeConnectivityType,
    NodeState, SequencerMetrics, SequencerStatus,
};
use crate::wire::codec::{self, CodecError, WireDecode, WireEncode};

impl ConnectionStatus {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ConnectionStatus::Ok => "OK",
            ConnectionStatus::Failed => "FAILED",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "OK" => Some(ConnectionStatus::Ok),
            "FAILED" => Some(ConnectionStatus::Failed),
            _ => None,
        }
    }
}

impl WireEncode for ConnectionStatus {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        codec::put_str(buf, self.wire_name());
    }
}

impl WireDecode for ConnectionStatus {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        let name = codec::get_str(buf)?;
        Self::from_wire_name(&name).ok_or(CodecError::UnknownEnum {
            kind: "ConnectionStatus",
            name,
        })
    }
}

impl NodeConnectivityType {
    pub fn wire_name(&self) -> &'static str {
        match self {
            NodeConnectivityType::NotReady => "NOT_READY",
            NodeConnectivityType::Connected => "CONNECTED",
            NodeConnectivityType::Unavailable => "UNAVAILABLE",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "NOT_READY" => Some(NodeConnectivityType::NotReady),
            "CONNECTED" => Some(NodeConnectivityType::Connected),
            "UNAVAILABLE" => Some(NodeConnectivityType::Unavailable),
            _ => None,
        }
    }
}

impl WireEncode for NodeConnectivityType {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        codec::put_str(buf, self.wire_name());
    }
}

impl WireDecode for NodeConnectivityType {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        let name = codec::get_str(buf)?;
        Self::from_wire_name(&name).ok_or(CodecError::UnknownEnum {
            kind: "NodeConnectivityType",
            name,
        })
    }
}

impl SequencerStatus {
    pub fn wire_name(&self) -> &'static str {
        match self {
            SequencerStatus::Ready => "READY",
            SequencerStatus::NotReady => "NOT_READY",
            SequencerStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "READY" => Some(SequencerStatus::Ready),
            "NOT_READY" => Some(SequencerStatus::NotReady),
            "UNKNOWN" => Some(SequencerStatus::Unknown),
            _ => None,
        }
    }
}

impl WireEncode for SequencerStatus {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        codec::put_str(buf, self.wire_name());
    }
}

impl WireDecode for SequencerStatus {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        let name = codec::get_str(buf)?;
        Self::from_wire_name(&name).ok_or(CodecError::UnknownEnum {
            kind: "SequencerStatus",
            name,
        })
    }
}

impl WireEncode for NodeConnectivity {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        codec::put_str(buf, &self.endpoint);
        self.node_type.encode(buf);
        codec::put_map(buf, &self.connectivity);
        codec::put_i64(buf, self.epoch);
    }
}

impl WireDecode for NodeConnectivity {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        Ok(NodeConnectivity {
            endpoint: codec::get_str(buf)?,
            node_type: NodeConnectivityType::decode(buf)?,
            connectivity: codec::get_map(buf)?,
            epoch: codec::get_i64(buf)?,
        })
    }
}

impl WireEncode for SequencerMetrics {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.sequencer_status.encode(buf);
    }
}

impl WireDecode for SequencerMetrics {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        Ok(SequencerMetrics {
            sequencer_status: SequencerStatus::decode(buf)?,
        })
    }
}

impl WireEncode for HeartbeatTimestamp {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        codec::put_i64(buf, self.epoch);
        codec::put_i64(buf, self.counter);
    }
}

impl WireDecode for HeartbeatTimestamp {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        Ok(HeartbeatTimestamp {
            epoch: codec::get_i64(buf)?,
            counter: codec::get_i64(buf)?,
        })
    }
}

impl WireEncode for NodeState {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        self.connectivity.encode(buf);
        self.sequencer_metrics.encode(buf);
        self.heartbeat.encode(buf);
    }
}

impl WireDecode for NodeState {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        Ok(NodeState {
            connectivity: NodeConnectivity::decode(buf)?,
            sequencer_metrics: SequencerMetrics::decode(buf)?,
            heartbeat: HeartbeatTimestamp::decode(buf)?,
        })
    }
}

impl WireEncode for ClusterState {
    fn encode<B: BufMut>(&self, buf: &mut B) {
        codec::put_map(buf, &self.nodes);
        codec::put_str(buf, &self.local_endpoint);
    }
}

impl WireDecode for ClusterState {
    fn decode<B: Buf>(buf: &mut B) -> Result<Self, CodecError> {
        Ok(ClusterState {
            nodes: codec::get_map(buf)?,
            local_endpoint: codec::get_str(buf)?,
        })
    }
}
