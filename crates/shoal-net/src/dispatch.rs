use shoal_protocol::{Header, Message, MessageKind};
use shoal_table::{Dispatch, TableError, TableOp};
use shoal_types::Blob;
use tracing::debug;

use crate::transport::Transport;

/// Sequential fan-out over the transport: one request per shard in rank
/// order, then exactly one reply per shard collected off the inbound
/// channel. Shard `i` is served by rank `i`; replies may arrive in any
/// order and are returned in arrival order.
pub struct SyncDispatcher<'t> {
    transport: &'t Transport,
}

impl<'t> SyncDispatcher<'t> {
    pub fn new(transport: &'t Transport) -> Self {
        Self { transport }
    }
}

impl Dispatch for SyncDispatcher<'_> {
    fn issue_and_collect(
        &self,
        table_id: u32,
        op: TableOp,
        requests: Vec<Vec<Blob<'_>>>,
    ) -> Result<Vec<Vec<Blob<'static>>>, TableError> {
        let kind = match op {
            TableOp::Get => MessageKind::Get,
            TableOp::Add => MessageKind::Add,
        };
        let fanout = requests.len();

        for (shard, data) in requests.into_iter().enumerate() {
            let msg = Message::with_data(
                Header {
                    src: self.transport.rank() as u32,
                    dst: shard as u32,
                    table_id,
                    kind,
                },
                data,
            );
            self.transport
                .send(&msg)
                .map_err(|e| TableError::Dispatch(e.to_string()))?;
        }
        debug!(table_id, fanout, ?op, "issued shard requests");

        let mut replies = Vec::with_capacity(fanout);
        while replies.len() < fanout {
            let (msg, _) = self
                .transport
                .recv()
                .map_err(|e| TableError::Dispatch(e.to_string()))?;
            if msg.header.table_id != table_id || msg.header.kind != kind.reply_kind() {
                return Err(TableError::Dispatch(format!(
                    "unexpected reply: table {} kind {:?} (wanted table {} kind {:?})",
                    msg.header.table_id,
                    msg.header.kind,
                    table_id,
                    kind.reply_kind()
                )));
            }
            replies.push(msg.data);
        }
        Ok(replies)
    }
}
