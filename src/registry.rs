use crate::api::invidious::VideoProvider;
use crate::api::spotify::SpotifyProvider;
use crate::api::Provider;
use crate::config::Config;
use std::sync::Arc;
use tracing::{info, warn};

/// Optional capabilities, read once when a provider is registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub playlists: bool,
    pub oauth: bool,
}

impl Capabilities {
    fn of(provider: &dyn Provider) -> Self {
        Self {
            playlists: provider.as_playlist_provider().is_some(),
            oauth: provider.as_oauth_provider().is_some(),
        }
    }
}

struct Entry {
    name: String,
    provider: Arc<dyn Provider>,
    capabilities: Capabilities,
}

/// Configured providers keyed by lower-cased platform name.
///
/// Registration order is kept: passive scanning tries providers in this
/// order and the first one that parses a URL wins.
#[derive(Default)]
pub struct ProviderRegistry {
    entries: Vec<Entry>,
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `name`. Re-registering a name replaces the provider in place.
    pub fn register(&mut self, name: &str, provider: Arc<dyn Provider>) {
        let name = key(name);
        let capabilities = Capabilities::of(provider.as_ref());
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == name) {
            warn!("Provider {} registered twice; replacing", name);
            existing.provider = provider;
            existing.capabilities = capabilities;
            return;
        }
        info!(
            "Registered provider {} (playlists: {}, oauth: {})",
            name, capabilities.playlists, capabilities.oauth
        );
        self.entries.push(Entry {
            name,
            provider,
            capabilities,
        });
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Provider>> {
        let name = key(name);
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.provider.clone())
    }

    pub fn capabilities(&self, name: &str) -> Option<Capabilities> {
        let name = key(name);
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.capabilities)
    }

    pub fn list_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn filter_by_capability<F>(&self, predicate: F) -> Vec<String>
    where
        F: Fn(&Capabilities) -> bool,
    {
        self.entries
            .iter()
            .filter(|e| predicate(&e.capabilities))
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn playlist_capable(&self) -> Vec<String> {
        self.filter_by_capability(|c| c.playlists)
    }

    /// Providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Provider>)> {
        self.entries.iter().map(|e| (e.name.as_str(), &e.provider))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the registry for a config. Spotify is only added when both
    /// client credentials are present.
    pub fn from_config(cfg: &Config) -> Self {
        let mut registry = Self::new();
        let spotify = SpotifyProvider::new(cfg.spotify.client_id.clone(), cfg.spotify.client_secret.clone());
        if spotify.is_authenticated() {
            registry.register("spotify", Arc::new(spotify));
        } else {
            warn!("No Spotify client credentials configured; spotify platform disabled");
        }
        let instance = cfg.invidious.instance_url.as_str();
        registry.register("youtube", Arc::new(VideoProvider::youtube(instance)));
        registry.register("youtube_music", Arc::new(VideoProvider::youtube_music(instance)));
        // Matches any host with a watch?v= path, so it goes last.
        registry.register("invidious", Arc::new(VideoProvider::invidious(instance)));
        registry
    }
}
