//! Operator configuration and the delta between two snapshots.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Operator-facing options.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CharmConfig {
    /// Whether MicroCeph storage is part of the cluster.
    pub microceph: bool,

    /// Whether MicroOVN networking is part of the cluster.
    pub microovn: bool,

    /// Snap channel of LXD.
    pub snap_channel_lxd: String,

    /// Snap channel of MicroCeph.
    pub snap_channel_microceph: String,

    /// Snap channel of MicroCloud.
    pub snap_channel_microcloud: String,

    /// Snap channel of MicroOVN.
    pub snap_channel_microovn: String,
}

impl Default for CharmConfig {
    fn default() -> Self {
        Self {
            microceph: false,
            microovn: false,
            snap_channel_lxd: "5.21/stable".to_string(),
            snap_channel_microceph: "squid/stable".to_string(),
            snap_channel_microcloud: "2/stable".to_string(),
            snap_channel_microovn: "24.03/stable".to_string(),
        }
    }
}

/// The last configuration a member applied.
pub type ConfigSnapshot = CharmConfig;

/// One configuration option.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ConfigKey {
    /// `microceph`
    MicroCeph,

    /// `microovn`
    MicroOvn,

    /// `snap-channel-lxd`
    SnapChannelLxd,

    /// `snap-channel-microceph`
    SnapChannelMicroCeph,

    /// `snap-channel-microcloud`
    SnapChannelMicroCloud,

    /// `snap-channel-microovn`
    SnapChannelMicroOvn,
}

impl ConfigKey {
    /// Every key, in option order.
    pub const ALL: [Self; 6] = [
        Self::MicroCeph,
        Self::MicroOvn,
        Self::SnapChannelLxd,
        Self::SnapChannelMicroCeph,
        Self::SnapChannelMicroCloud,
        Self::SnapChannelMicroOvn,
    ];

    /// The option name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MicroCeph => "microceph",
            Self::MicroOvn => "microovn",
            Self::SnapChannelLxd => "snap-channel-lxd",
            Self::SnapChannelMicroCeph => "snap-channel-microceph",
            Self::SnapChannelMicroCloud => "snap-channel-microcloud",
            Self::SnapChannelMicroOvn => "snap-channel-microovn",
        }
    }

    /// The snap a channel option refers to, `None` for feature toggles.
    #[must_use]
    pub const fn snap(self) -> Option<&'static str> {
        match self {
            Self::MicroCeph | Self::MicroOvn => None,
            Self::SnapChannelLxd => Some("lxd"),
            Self::SnapChannelMicroCeph => Some("microceph"),
            Self::SnapChannelMicroCloud => Some("microcloud"),
            Self::SnapChannelMicroOvn => Some("microovn"),
        }
    }

    /// Whether this is a feature toggle rather than a channel.
    #[must_use]
    pub const fn is_toggle(self) -> bool {
        self.snap().is_none()
    }
}

/// Keys whose values differ between two configurations.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigDelta {
    /// Changed keys, in option order.
    pub changed: Vec<ConfigKey>,
}

impl ConfigDelta {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Changed channel options.
    pub fn channels(&self) -> impl Iterator<Item = ConfigKey> + '_ {
        self.changed.iter().copied().filter(|key| !key.is_toggle())
    }

    /// Changed feature toggles.
    pub fn toggles(&self) -> impl Iterator<Item = ConfigKey> + '_ {
        self.changed.iter().copied().filter(|key| key.is_toggle())
    }

    /// Comma separated option names.
    #[must_use]
    pub fn describe(&self) -> String {
        self.changed
            .iter()
            .map(|key| key.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl CharmConfig {
    /// Value of a channel option, `None` for feature toggles.
    #[must_use]
    pub fn channel(&self, key: ConfigKey) -> Option<&str> {
        match key {
            ConfigKey::MicroCeph | ConfigKey::MicroOvn => None,
            ConfigKey::SnapChannelLxd => Some(&self.snap_channel_lxd),
            ConfigKey::SnapChannelMicroCeph => Some(&self.snap_channel_microceph),
            ConfigKey::SnapChannelMicroCloud => Some(&self.snap_channel_microcloud),
            ConfigKey::SnapChannelMicroOvn => Some(&self.snap_channel_microovn),
        }
    }

    const fn toggle(&self, key: ConfigKey) -> Option<bool> {
        match key {
            ConfigKey::MicroCeph => Some(self.microceph),
            ConfigKey::MicroOvn => Some(self.microovn),
            _ => None,
        }
    }

    /// Keys whose value in `new` differs from `self`.
    #[must_use]
    pub fn delta(&self, new: &Self) -> ConfigDelta {
        let changed = ConfigKey::ALL
            .into_iter()
            .filter(|key| {
                self.channel(*key) != new.channel(*key) || self.toggle(*key) != new.toggle(*key)
            })
            .collect();

        ConfigDelta { changed }
    }

    /// Whether the snap behind a channel option is deployed with this configuration.
    #[must_use]
    pub const fn uses_snap(&self, key: ConfigKey) -> bool {
        match key {
            ConfigKey::SnapChannelLxd | ConfigKey::SnapChannelMicroCloud => true,
            ConfigKey::SnapChannelMicroCeph => self.microceph,
            ConfigKey::SnapChannelMicroOvn => self.microovn,
            ConfigKey::MicroCeph | ConfigKey::MicroOvn => false,
        }
    }

    /// Checks the options that must always be set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the LXD or MicroCloud channel is empty.
    pub fn validate(&self) -> Result<()> {
        for key in [ConfigKey::SnapChannelLxd, ConfigKey::SnapChannelMicroCloud] {
            if self.channel(key).is_some_and(|channel| channel.trim().is_empty()) {
                return Err(Error::InvalidConfig(format!("{} must not be empty", key.as_str())));
            }
        }

        Ok(())
    }
}
