use anyhow::{anyhow, Context, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::FluentResource;
use std::collections::HashMap;
use tracing::warn;
use unic_langid::LanguageIdentifier;

/// Locale used when the requested one has no resources
pub const FALLBACK_LOCALE: &str = "ru";

/// Embedded Fluent resources, keyed by locale
const RESOURCES: &[(&str, &str)] = &[
    ("ru", include_str!("../locales/ru/main.ftl")),
    ("en", include_str!("../locales/en/main.ftl")),
];

/// Localization manager for the bot
///
/// Holds one bundle per supported locale and renders every reply in the
/// locale chosen at startup.
pub struct Localizer {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
    locale: String,
}

impl Localizer {
    /// Create a localizer that renders messages in `locale`, falling back to
    /// Russian when the locale is unknown
    pub fn new(locale: &str) -> Result<Self> {
        let mut bundles = HashMap::new();

        for (code, source) in RESOURCES {
            let bundle = Self::create_bundle(code, source)?;
            bundles.insert(code.to_string(), bundle);
        }

        let locale = if bundles.contains_key(locale) {
            locale.to_string()
        } else {
            warn!(locale = %locale, fallback = FALLBACK_LOCALE, "Unsupported locale requested");
            FALLBACK_LOCALE.to_string()
        };

        Ok(Self { bundles, locale })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(code: &str, source: &str) -> Result<FluentBundle<FluentResource>> {
        let langid: LanguageIdentifier = code
            .parse()
            .with_context(|| format!("Invalid locale identifier: {code}"))?;
        let mut bundle = FluentBundle::new_concurrent(vec![langid]);
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Failed to parse {code} resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Failed to load {code} resource: {errors:?}"))?;

        Ok(bundle)
    }

    /// The locale replies are rendered in
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Get a localized message
    pub fn text(&self, key: &str) -> String {
        let Some(bundle) = self.bundles.get(&self.locale) else {
            return format!("Missing translation: {key}");
        };

        let Some(message) = bundle.get_message(key) else {
            return format!("Missing translation: {key}");
        };
        let Some(pattern) = message.value() else {
            return format!("Missing value for key: {key}");
        };

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, None, &mut errors);
        if !errors.is_empty() {
            warn!(key = %key, errors = ?errors, "Errors while formatting message");
        }
        value.into_owned()
    }
}
