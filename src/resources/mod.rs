/**
 * This module contains all logic for loading textures from external files.
 */
pub mod texture;

/// Resolves `file_name` against the page the canvas lives on.
#[cfg(target_arch = "wasm32")]
pub fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    use anyhow::Context as _;

    let window = web_sys::window().context("no browser window")?;
    let href = window
        .location()
        .href()
        .map_err(|e| anyhow::anyhow!("reading the page location: {e:?}"))?;
    let base = reqwest::Url::parse(&href)?;
    Ok(base.join(file_name)?)
}

/// Path under `./assets` a relative asset name is read from on desktop.
#[cfg(not(target_arch = "wasm32"))]
pub fn asset_path(file_name: &str) -> std::path::PathBuf {
    std::path::Path::new("./").join("assets").join(file_name)
}

/// Fetches the raw bytes of a relative asset name.
pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        reqwest::get(url)
            .await?
            .error_for_status()?
            .bytes()
            .await?
            .to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = tokio::fs::read(asset_path(file_name)).await?;

    Ok(data)
}
