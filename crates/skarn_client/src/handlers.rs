use glam::{DVec3, IVec3};
use tracing::{debug, info};

use skarn_shared::block::BlockId;
use skarn_shared::coords::ColumnPos;
use skarn_shared::protocol::{
    self, BlockRecord, ColumnFlags, ColumnMeta, MessageKind, TextOrigin, BRAND_CHANNEL, C2S, S2C,
};

use crate::dispatch::{Dispatcher, HandlerError, HandlerResult};
use crate::session::Session;

/// Brand string announced to the server after joining.
pub const CLIENT_BRAND: &str = "skarn";

/// Installs the default handler set. Adding protocol coverage means adding
/// a handler function and one entry here; dispatch itself never changes.
pub fn register_defaults(dispatcher: &mut Dispatcher) {
    dispatcher.register(MessageKind::JoinGame, |session, msg| {
        let S2C::JoinGame { player_id, .. } = msg else {
            return Err(HandlerError::UnexpectedVariant(MessageKind::JoinGame));
        };
        on_join_game(session, player_id)
    });
    dispatcher.register(MessageKind::ServerText, |session, msg| {
        let S2C::ServerText { origin, text } = msg else {
            return Err(HandlerError::UnexpectedVariant(MessageKind::ServerText));
        };
        on_server_text(session, origin, text)
    });
    dispatcher.register(MessageKind::Respawn, |session, msg| {
        let S2C::Respawn { dimension } = msg else {
            return Err(HandlerError::UnexpectedVariant(MessageKind::Respawn));
        };
        on_respawn(session, dimension)
    });
    dispatcher.register(MessageKind::ChunkColumn, |session, msg| {
        let S2C::ChunkColumn {
            pos,
            sections,
            flags,
            data,
        } = msg
        else {
            return Err(HandlerError::UnexpectedVariant(MessageKind::ChunkColumn));
        };
        on_chunk_column(session, pos, sections, flags, data)
    });
    dispatcher.register(MessageKind::ChunkColumnBatch, |session, msg| {
        let S2C::ChunkColumnBatch {
            sky_light,
            columns,
            data,
        } = msg
        else {
            return Err(HandlerError::UnexpectedVariant(
                MessageKind::ChunkColumnBatch,
            ));
        };
        on_chunk_column_batch(session, sky_light, columns, data)
    });
    dispatcher.register(MessageKind::BlockChange, |session, msg| {
        let S2C::BlockChange { world_pos, block } = msg else {
            return Err(HandlerError::UnexpectedVariant(MessageKind::BlockChange));
        };
        on_block_change(session, world_pos, block)
    });
    dispatcher.register(MessageKind::MultiBlockChange, |session, msg| {
        let S2C::MultiBlockChange { column, records } = msg else {
            return Err(HandlerError::UnexpectedVariant(
                MessageKind::MultiBlockChange,
            ));
        };
        on_multi_block_change(session, column, records)
    });
    dispatcher.register(MessageKind::PluginMessage, |session, msg| {
        let S2C::PluginMessage { channel, data } = msg else {
            return Err(HandlerError::UnexpectedVariant(MessageKind::PluginMessage));
        };
        on_plugin_message(session, channel, data)
    });
    dispatcher.register(MessageKind::TeleportPlayer, |session, msg| {
        let S2C::TeleportPlayer {
            position,
            yaw,
            pitch,
        } = msg
        else {
            return Err(HandlerError::UnexpectedVariant(MessageKind::TeleportPlayer));
        };
        on_teleport(session, position, yaw, pitch)
    });
}

fn on_join_game(session: &Session, player_id: i32) -> HandlerResult {
    session.mark_ready();
    info!("joined as player {player_id}");
    let data = protocol::encode(&CLIENT_BRAND);
    session
        .outbound
        .send(C2S::PluginMessage {
            channel: BRAND_CHANNEL.to_owned(),
            data,
        })
        .map_err(|_| HandlerError::OutboundClosed)
}

fn on_server_text(session: &Session, origin: TextOrigin, text: String) -> HandlerResult {
    info!("server text ({origin:?}): {text}");
    session.chat.push(origin, text);
    Ok(())
}

fn on_respawn(session: &Session, dimension: i32) -> HandlerResult {
    info!("respawning into dimension {dimension}");
    session.world.clear();
    Ok(())
}

fn on_chunk_column(
    session: &Session,
    pos: ColumnPos,
    sections: u16,
    flags: u8,
    data: Vec<u8>,
) -> HandlerResult {
    let flags = ColumnFlags::from_bits_truncate(flags);
    if sections == 0 {
        // Nothing to decode. A full-column update with no sections is the
        // unload instruction; an empty partial update carries no effect.
        if flags.contains(ColumnFlags::FULL_COLUMN) {
            session.world.remove_column(pos);
        } else {
            debug!("empty partial column update for {pos:?} ignored");
        }
        return Ok(());
    }
    session
        .ingest
        .submit_column(session.world.generation(), pos, sections, flags, data);
    Ok(())
}

fn on_chunk_column_batch(
    session: &Session,
    sky_light: bool,
    columns: Vec<ColumnMeta>,
    data: Vec<u8>,
) -> HandlerResult {
    session
        .ingest
        .submit_batch(session.world.generation(), sky_light, columns, data);
    Ok(())
}

fn on_block_change(session: &Session, world_pos: IVec3, block: BlockId) -> HandlerResult {
    session.world.set_block(world_pos, block);
    Ok(())
}

fn on_multi_block_change(
    session: &Session,
    column: ColumnPos,
    records: Vec<BlockRecord>,
) -> HandlerResult {
    session.world.apply_block_batch(column, &records);
    Ok(())
}

fn on_plugin_message(session: &Session, channel: String, data: Vec<u8>) -> HandlerResult {
    match channel.as_str() {
        BRAND_CHANNEL => {
            let brand: String = protocol::decode(&data).map_err(|source| {
                HandlerError::Payload {
                    context: "server brand",
                    source,
                }
            })?;
            info!("server is running {brand}");
            session.set_server_brand(brand);
            Ok(())
        }
        other => {
            debug!("ignoring plugin message on unknown channel {other}");
            Ok(())
        }
    }
}

/// Protocol contract: the server expects a position acknowledgement for
/// every teleport before it trusts further movement, so the ack is
/// enqueued here, synchronously, once per message. The camera itself is
/// render-owned and only mutated through the hand-off queue.
fn on_teleport(session: &Session, position: DVec3, yaw: f32, pitch: f32) -> HandlerResult {
    session
        .outbound
        .send(C2S::PositionLook {
            position,
            yaw,
            pitch,
            on_ground: false,
        })
        .map_err(|_| HandlerError::OutboundClosed)?;
    session
        .handoff
        .post(move |state| state.camera.apply_teleport(position, yaw, pitch))?;
    Ok(())
}
