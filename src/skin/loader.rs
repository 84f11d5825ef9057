//! Resolves texture descriptors into loaded atlases.
//!
//! A descriptor is either a plain string, guessed by its shape, or an object
//! naming the source explicitly:
//!
//! ```json
//! "Notch"                                   // username
//! "069a79f4-44e9-4726-a5be-fca90e38aaf5"    // uuid
//! "https://example.com/skin.png"            // url
//! {"username": "Notch", "capeUrl": "https://example.com/cape.png", "slim": true}
//! ```

use std::{future::Future, str::FromStr, sync::Arc};

use serde::Deserialize;

use crate::{
    config::Endpoints,
    data_structures::texture::TextureAtlas,
    error::{Result, SkinError},
    resources::{SkinFetcher, decode_inline},
    skin::texture_positions::AtlasVersion,
};

/// Longest string treated as a player name.
pub const MAX_USERNAME_LEN: usize = 16;
/// Longest string treated as a player uuid (dashed form).
pub const MAX_UUID_LEN: usize = 36;

/// Columns that stay transparent on slim skins, as `(x, y, height)`.
const SLIM_COLUMNS: [(u32, u32, u32); 2] = [(46, 52, 12), (54, 20, 12)];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkinSource {
    Url(String),
    /// Inline image, a base64 data url or bare base64.
    Data(String),
    /// A player name resolved to an identifier through the lookup service.
    Username { name: String, overlay: bool },
    Uuid(String),
    Mineskin(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CapeSource {
    Url(String),
    Data(String),
    Mineskin(String),
}

/// What to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub skin: SkinSource,
    pub cape: Option<CapeSource>,
    /// Skips slim detection when set.
    pub slim: Option<bool>,
    /// Lay the cape out with the high resolution table.
    pub optifine: bool,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct RawDescriptor {
    url: Option<String>,
    data: Option<String>,
    username: Option<String>,
    uuid: Option<String>,
    mineskin: Option<String>,
    cape_url: Option<String>,
    cape_data: Option<String>,
    slim: Option<bool>,
    optifine: bool,
}

impl TextureDescriptor {
    pub fn new(skin: SkinSource) -> Self {
        Self {
            skin,
            cape: None,
            slim: None,
            optifine: false,
        }
    }

    /// Guesses the source of a plain string.
    pub fn parse(texture: &str) -> Result<Self> {
        let texture = texture.trim();
        let len = texture.chars().count();
        let skin = if texture.is_empty() {
            return Err(SkinError::InvalidDescriptor("empty string".to_string()));
        } else if texture.starts_with("http") {
            SkinSource::Url(texture.to_string())
        } else if len <= MAX_USERNAME_LEN {
            SkinSource::Username {
                name: texture.to_string(),
                overlay: false,
            }
        } else if len <= MAX_UUID_LEN {
            SkinSource::Uuid(texture.to_string())
        } else {
            SkinSource::Data(texture.to_string())
        };
        Ok(Self::new(skin))
    }

    /// Parses a JSON string or object descriptor.
    pub fn from_json(json: &str) -> Result<Self> {
        match serde_json::from_str::<serde_json::Value>(json)? {
            serde_json::Value::String(texture) => Self::parse(&texture),
            value @ serde_json::Value::Object(_) => {
                Self::from_raw(serde_json::from_value(value)?)
            }
            other => Err(SkinError::InvalidDescriptor(other.to_string())),
        }
    }

    fn from_raw(raw: RawDescriptor) -> Result<Self> {
        let mineskin = raw.mineskin.filter(|id| !id.is_empty());
        let skin = if let Some(url) = raw.url {
            SkinSource::Url(url)
        } else if let Some(data) = raw.data {
            SkinSource::Data(data)
        } else if let Some(name) = raw.username {
            SkinSource::Username {
                name,
                overlay: true,
            }
        } else if let Some(uuid) = raw.uuid {
            SkinSource::Uuid(uuid)
        } else if let Some(id) = mineskin.clone() {
            SkinSource::Mineskin(id)
        } else {
            return Err(SkinError::InvalidDescriptor(
                "object names no skin source".to_string(),
            ));
        };
        let cape = if let Some(url) = raw.cape_url {
            Some(CapeSource::Url(url))
        } else if let Some(data) = raw.cape_data {
            Some(CapeSource::Data(data))
        } else {
            mineskin.map(CapeSource::Mineskin)
        };
        Ok(Self {
            skin,
            cape,
            slim: raw.slim,
            optifine: raw.optifine,
        })
    }
}

impl FromStr for TextureDescriptor {
    type Err = SkinError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Atlases ready to be assembled into a model.
#[derive(Clone, Debug)]
pub struct LoadedSkin {
    /// Load generation this result belongs to.
    pub generation: u64,
    pub skin: Arc<TextureAtlas>,
    pub cape: Option<Arc<TextureAtlas>>,
    pub version: Option<AtlasVersion>,
    pub slim: bool,
    pub optifine: bool,
}

/// `true` when none of the pixels in the slim columns is fully opaque.
///
/// Pixels outside of the atlas count as transparent.
pub fn detect_slim(atlas: &TextureAtlas) -> bool {
    SLIM_COLUMNS.iter().all(|&(x, y, height)| {
        (y..y + height).all(|row| atlas.alpha(x, row) != u8::MAX)
    })
}

#[derive(Clone, Debug)]
pub struct TextureLoader<F> {
    fetcher: F,
    endpoints: Endpoints,
}

impl<F> TextureLoader<F>
where
    F: SkinFetcher + Clone + 'static,
{
    pub fn new(fetcher: F, endpoints: Endpoints) -> Self {
        Self { fetcher, endpoints }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Loads skin and cape concurrently.
    ///
    /// The result is only produced once both settled. A failing cape is logged
    /// and left out, a failing skin fails the whole load.
    pub fn load(
        &self,
        descriptor: TextureDescriptor,
        generation: u64,
    ) -> impl Future<Output = Result<LoadedSkin>> + use<F> {
        let fetcher = self.fetcher.clone();
        let endpoints = self.endpoints.clone();
        async move {
            log::info!("Has cape: {}", descriptor.cape.is_some());
            let skin = load_skin(&fetcher, &endpoints, &descriptor.skin);
            let cape = async {
                match &descriptor.cape {
                    Some(source) => load_cape(&fetcher, &endpoints, source).await,
                    None => None,
                }
            };
            let (skin, cape) = futures::future::join(skin, cape).await;
            let skin = skin.inspect_err(|e| log::warn!("Skin image error: {e}"))?;

            let version = AtlasVersion::detect(skin.height());
            log::info!("Skin texture version: {version:?}");
            let slim = match descriptor.slim {
                Some(slim) => slim,
                None => {
                    let slim = detect_slim(&skin);
                    log::info!("Slim detection: {slim}");
                    slim
                }
            };
            Ok(LoadedSkin {
                generation,
                skin: Arc::new(skin),
                cape: cape.map(Arc::new),
                version,
                slim,
                optifine: descriptor.optifine,
            })
        }
    }
}

/// Url the skin of `source` is fetched from, `None` for inline data.
pub async fn resolve_skin_url<F: SkinFetcher>(
    fetcher: &F,
    endpoints: &Endpoints,
    source: &SkinSource,
) -> Result<Option<String>> {
    let url = match source {
        SkinSource::Url(url) => url.clone(),
        SkinSource::Data(_) => return Ok(None),
        SkinSource::Username { name, overlay } => {
            let id = lookup_player_id(fetcher, endpoints, name).await?;
            let mut url = format!("{}{}", endpoints.skin_host, id);
            if *overlay {
                url.push_str("?overlay");
            }
            url
        }
        SkinSource::Uuid(uuid) => format!("{}{}?overlay", endpoints.skin_host, uuid),
        SkinSource::Mineskin(id) => format!("{}{}", endpoints.mineskin_host, id),
    };
    Ok(Some(url))
}

pub fn cape_url(endpoints: &Endpoints, source: &CapeSource) -> Option<String> {
    match source {
        CapeSource::Url(url) => Some(url.clone()),
        CapeSource::Data(_) => None,
        CapeSource::Mineskin(id) => Some(format!("{}{}/cape", endpoints.mineskin_host, id)),
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    id: Option<String>,
}

/// Resolves a player name through the lookup service.
///
/// Falls back to the name itself when the service knows no id for it.
pub async fn lookup_player_id<F: SkinFetcher>(
    fetcher: &F,
    endpoints: &Endpoints,
    name: &str,
) -> Result<String> {
    let url = format!("{}{}", endpoints.name_lookup, name);
    let lookup = async {
        let text = fetcher.fetch_text(&url).await?;
        anyhow::Ok(serde_json::from_str::<LookupResponse>(&text)?)
    };
    let response = lookup.await.map_err(|source| SkinError::Lookup {
        name: name.to_string(),
        source,
    })?;
    Ok(response
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| name.to_string()))
}

async fn load_skin<F: SkinFetcher>(
    fetcher: &F,
    endpoints: &Endpoints,
    source: &SkinSource,
) -> Result<TextureAtlas> {
    let url = resolve_skin_url(fetcher, endpoints, source).await?;
    let inline = match source {
        SkinSource::Data(data) => Some(data.as_str()),
        _ => None,
    };
    let (label, bytes) = fetch_image(fetcher, url.as_deref(), inline).await;
    let bytes = bytes.map_err(|source| SkinError::SkinLoad { url: label, source })?;
    Ok(TextureAtlas::from_bytes(&bytes)?)
}

async fn load_cape<F: SkinFetcher>(
    fetcher: &F,
    endpoints: &Endpoints,
    source: &CapeSource,
) -> Option<TextureAtlas> {
    let url = cape_url(endpoints, source);
    let inline = match source {
        CapeSource::Data(data) => Some(data.as_str()),
        _ => None,
    };
    let (label, bytes) = fetch_image(fetcher, url.as_deref(), inline).await;
    let atlas = bytes.and_then(|bytes| Ok(TextureAtlas::from_bytes(&bytes)?));
    match atlas {
        Ok(atlas) => {
            log::info!("Cape image loaded");
            Some(atlas)
        }
        Err(source) => {
            let error = SkinError::CapeLoad { url: label, source };
            log::warn!("Cape image error, continuing without cape: {error}");
            None
        }
    }
}

/// Fetches `url` or decodes `inline`, returning a label for error reports.
async fn fetch_image<F: SkinFetcher>(
    fetcher: &F,
    url: Option<&str>,
    inline: Option<&str>,
) -> (String, anyhow::Result<Vec<u8>>) {
    match (url, inline) {
        (Some(url), _) if url.starts_with("data:") => {
            ("inline data".to_string(), decode_inline(url))
        }
        (Some(url), _) => (url.to_string(), fetcher.fetch_bytes(url).await),
        (None, Some(data)) => ("inline data".to_string(), decode_inline(data)),
        (None, None) => (
            String::new(),
            Err(anyhow::anyhow!("No texture source given")),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_string_sources_by_shape() {
        assert_eq!(
            TextureDescriptor::parse("https://example.com/a.png").unwrap().skin,
            SkinSource::Url("https://example.com/a.png".to_string())
        );
        assert_eq!(
            TextureDescriptor::parse("inventivetalent").unwrap().skin,
            SkinSource::Username {
                name: "inventivetalent".to_string(),
                overlay: false
            }
        );
        assert_eq!(
            TextureDescriptor::parse("069a79f444e94726a5befca90e38aaf5").unwrap().skin,
            SkinSource::Uuid("069a79f444e94726a5befca90e38aaf5".to_string())
        );
        assert!(matches!(
            TextureDescriptor::parse("data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAA")
                .unwrap()
                .skin,
            SkinSource::Data(_)
        ));
    }

    #[test]
    fn empty_strings_are_invalid() {
        assert!(matches!(
            TextureDescriptor::parse("  "),
            Err(SkinError::InvalidDescriptor(_))
        ));
    }

    #[test]
    fn object_sources_follow_precedence() {
        let descriptor = TextureDescriptor::from_json(
            r#"{"uuid": "abc", "username": "Notch", "capeData": "AQID", "slim": true}"#,
        )
        .unwrap();
        assert_eq!(
            descriptor.skin,
            SkinSource::Username {
                name: "Notch".to_string(),
                overlay: true
            }
        );
        assert_eq!(descriptor.cape, Some(CapeSource::Data("AQID".to_string())));
        assert_eq!(descriptor.slim, Some(true));
    }

    #[test]
    fn mineskin_implies_a_cape() {
        let descriptor = TextureDescriptor::from_json(r#"{"mineskin": "1234"}"#).unwrap();
        assert_eq!(descriptor.skin, SkinSource::Mineskin("1234".to_string()));
        assert_eq!(descriptor.cape, Some(CapeSource::Mineskin("1234".to_string())));
    }

    #[test]
    fn rejects_objects_without_source_and_other_json() {
        assert!(matches!(
            TextureDescriptor::from_json(r#"{"slim": true}"#),
            Err(SkinError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            TextureDescriptor::from_json("42"),
            Err(SkinError::InvalidDescriptor(_))
        ));
    }
}
