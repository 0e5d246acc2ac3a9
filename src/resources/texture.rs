use anyhow::Context as _;
use image::RgbaImage;

use crate::{
    data_structures::block::BlockKind,
    resources::load_binary,
    runtime::{MaybeSend, Spawner},
};

/// Relative name a kind's texture is fetched by.
pub fn texture_path(prefix: &str, kind: BlockKind) -> String {
    format!("{prefix}{}", kind.texture_name())
}

/// Decodes any supported image format into RGBA8.
pub fn decode(bytes: &[u8]) -> anyhow::Result<RgbaImage> {
    let img = image::load_from_memory(bytes).context("decoding image")?;
    Ok(img.to_rgba8())
}

pub async fn load_block_texture(prefix: &str, kind: BlockKind) -> anyhow::Result<RgbaImage> {
    let path = texture_path(prefix, kind);
    let bytes = load_binary(&path)
        .await
        .with_context(|| format!("fetching {path}"))?;
    decode(&bytes).with_context(|| format!("reading {path}"))
}

/// Starts one detached load per [`BlockKind`]. Each outcome is handed to
/// `on_done`; nothing is retried.
pub fn spawn_texture_loads<F>(spawner: &Spawner, prefix: &str, on_done: F)
where
    F: Fn(BlockKind, Result<RgbaImage, String>) + Clone + MaybeSend + 'static,
{
    for kind in BlockKind::ALL {
        let prefix = prefix.to_string();
        let on_done = on_done.clone();
        log::debug!("loading {}", texture_path(&prefix, kind));
        spawner.spawn(async move {
            let result = load_block_texture(&prefix, kind)
                .await
                .map_err(|e| format!("{e:#}"));
            on_done(kind, result);
        });
    }
}
