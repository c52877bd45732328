// crates/routes/src/music.rs

use std::sync::Arc;

use pipa_config::MusicConfig;
use pipa_core::{HomeApi, PipaError, PipaResult, RouteResult, RouteType};
use regex::Regex;
use serde_json::json;
use tracing::{debug, warn};

/// Phrases stripped from the utterance before the playback target remains.
const CONTROL_PHRASES: &[&str] = &[
    "我想", "我要", "帮我", "给我", "麻烦", "请", "播放", "来一首", "放一首", "听一下",
    "听听", "听", "放首歌", "放歌", "放", "的歌", "歌曲", "音乐", "一首歌", "一首", "在",
];

#[derive(Debug, PartialEq)]
enum MusicCommand {
    Pause,
    Resume,
    Next,
    Previous,
    Mute,
    Unmute,
    SetVolume(u32),
    Louder,
    Softer,
    Play(String),
}

pub struct MusicRoute {
    home: Arc<dyn HomeApi>,
    config: MusicConfig,
    player_re: Regex,
    volume_re: Regex,
}

impl MusicRoute {
    pub fn new(config: MusicConfig, home: Arc<dyn HomeApi>) -> Self {
        Self {
            home,
            config,
            player_re: Regex::new(r"media_player\.[a-z0-9_]+").expect("player id pattern"),
            volume_re: Regex::new(r"(?:音量(?:调到|设到|设为|调整到|到)?|volume(?:\s+to)?)\s*([0-9]{1,3})%?")
                .expect("volume pattern"),
        }
    }

    pub async fn handle(&self, text: &str) -> RouteResult {
        let lower = text.to_lowercase();

        let Some((player, spoken_name)) = self.target_player(&lower) else {
            return RouteResult::degraded(
                RouteType::StructuredMusic,
                "尚未配置默认播放器，请在配置的 music.default_player 中设置。",
                "missing_media_player",
            );
        };

        let command = self.parse_command(&lower);
        debug!(player = %player, ?command, "Dispatching music command");

        let outcome = match command {
            MusicCommand::Pause => self.simple_call(&player, "media_pause", "好的，已暂停播放。").await,
            MusicCommand::Resume => self.simple_call(&player, "media_play", "好的，继续播放。").await,
            MusicCommand::Next => self.simple_call(&player, "media_next_track", "已切到下一首。").await,
            MusicCommand::Previous => {
                self.simple_call(&player, "media_previous_track", "已切到上一首。").await
            }
            MusicCommand::Mute => self.set_mute(&player, true).await,
            MusicCommand::Unmute => self.set_mute(&player, false).await,
            MusicCommand::SetVolume(level) => self.set_volume(&player, level).await,
            MusicCommand::Louder => self.adjust_volume(&player, true).await,
            MusicCommand::Softer => self.adjust_volume(&player, false).await,
            MusicCommand::Play(query) => self.play(&player, &spoken_name, &query).await,
        };

        match outcome {
            Ok(text) => RouteResult::speech(RouteType::StructuredMusic, text),
            Err(err) => {
                warn!(player = %player, error = %err, "Music command failed");
                RouteResult::degraded(
                    RouteType::StructuredMusic,
                    "抱歉，音乐控制暂时不可用。",
                    "upstream_failed",
                )
            }
        }
    }

    /// Target device: explicit entity id beats the alias table, which beats
    /// the configured default. Longest alias wins so "主卧室" is not shadowed
    /// by "卧室".
    fn target_player(&self, text: &str) -> Option<(String, String)> {
        if let Some(m) = self.player_re.find(text) {
            return Some((m.as_str().to_string(), m.as_str().to_string()));
        }

        let best = self
            .config
            .room_aliases
            .iter()
            .filter(|(alias, _)| text.contains(alias.as_str()))
            .max_by_key(|(alias, _)| alias.chars().count());
        if let Some((alias, entity)) = best {
            return Some((entity.clone(), alias.clone()));
        }

        self.config
            .default_player
            .clone()
            .map(|entity| (entity.clone(), entity))
    }

    fn parse_command(&self, text: &str) -> MusicCommand {
        if text.contains("取消静音") || text.contains("unmute") {
            return MusicCommand::Unmute;
        }
        if text.contains("静音") || text.contains("mute") {
            return MusicCommand::Mute;
        }
        if let Some(caps) = self.volume_re.captures(text) {
            if let Ok(level) = caps[1].parse::<u32>() {
                return MusicCommand::SetVolume(level.min(100));
            }
        }
        if ["大声", "声音大", "大一点", "调高音量", "louder", "turn up"]
            .iter()
            .any(|kw| text.contains(kw))
        {
            return MusicCommand::Louder;
        }
        if ["小声", "声音小", "小一点", "调低音量", "quieter", "softer", "turn down"]
            .iter()
            .any(|kw| text.contains(kw))
        {
            return MusicCommand::Softer;
        }
        if text.contains("暂停") || text.contains("pause") {
            return MusicCommand::Pause;
        }
        if ["下一首", "换一首", "切歌", "next"].iter().any(|kw| text.contains(kw)) {
            return MusicCommand::Next;
        }
        if text.contains("上一首") || text.contains("previous") {
            return MusicCommand::Previous;
        }
        if ["继续", "接着放", "resume"].iter().any(|kw| text.contains(kw)) {
            return MusicCommand::Resume;
        }
        MusicCommand::Play(self.extract_play_target(text))
    }

    /// Strip control-verb phrases and room aliases; what is left is the
    /// playback target. "的" splits it into artist and track.
    fn extract_play_target(&self, text: &str) -> String {
        let mut remainder = text.to_string();
        for alias in self.config.room_aliases.keys() {
            remainder = remainder.replace(alias.as_str(), "");
        }
        for phrase in CONTROL_PHRASES {
            remainder = remainder.replace(phrase, "");
        }
        remainder.trim().to_string()
    }

    async fn simple_call(&self, player: &str, service: &str, reply: &str) -> PipaResult<String> {
        self.home
            .call_service("media_player", service, json!({ "entity_id": player }))
            .await?;
        Ok(reply.to_string())
    }

    async fn set_mute(&self, player: &str, muted: bool) -> PipaResult<String> {
        self.home
            .call_service(
                "media_player",
                "volume_mute",
                json!({ "entity_id": player, "is_volume_muted": muted }),
            )
            .await?;
        Ok(if muted { "已静音。" } else { "已取消静音。" }.to_string())
    }

    async fn set_volume(&self, player: &str, level: u32) -> PipaResult<String> {
        let target = f64::from(level.min(100)) / 100.0;
        let precise = self
            .home
            .call_service(
                "media_player",
                "volume_set",
                json!({ "entity_id": player, "volume_level": target }),
            )
            .await;

        if precise.is_ok() {
            return Ok(format!("音量已调到{}%。", level.min(100)));
        }

        // Precise path failed; fall back to coarse stepping toward the
        // target from whatever the device reports now.
        let current = self.current_volume(player).await;
        let (up, steps) = match current {
            Some(current) => {
                let diff = target - current;
                let steps = (diff.abs() / self.config.volume_step).round() as u32;
                (diff > 0.0, steps.max(1))
            }
            None => (target >= 0.5, 2),
        };
        self.coarse_adjust(player, up, steps).await?;
        Ok(format!("音量已大致调到{}%。", level.min(100)))
    }

    async fn adjust_volume(&self, player: &str, up: bool) -> PipaResult<String> {
        let reply = if up { "音量已调大。" } else { "音量已调小。" };

        if let Some(current) = self.current_volume(player).await {
            let step = if up {
                self.config.volume_step
            } else {
                -self.config.volume_step
            };
            let target = (current + step).clamp(0.0, 1.0);
            let precise = self
                .home
                .call_service(
                    "media_player",
                    "volume_set",
                    json!({ "entity_id": player, "volume_level": target }),
                )
                .await;
            if precise.is_ok() {
                return Ok(reply.to_string());
            }
        }

        self.coarse_adjust(player, up, 2).await?;
        Ok(reply.to_string())
    }

    async fn current_volume(&self, player: &str) -> Option<f64> {
        match self.home.entity_state(player).await {
            Ok(state) => state.attribute_f64("volume_level"),
            Err(err) => {
                debug!(player, error = %err, "Volume readback failed");
                None
            }
        }
    }

    /// Bounded step-based control path: at most `max_volume_steps` (hard cap
    /// 10) volume_up/volume_down calls, stopping at the first failure.
    async fn coarse_adjust(&self, player: &str, up: bool, steps: u32) -> PipaResult<()> {
        let service = if up { "volume_up" } else { "volume_down" };
        let steps = steps.min(self.config.max_volume_steps).min(10);

        let mut performed = 0;
        for _ in 0..steps {
            match self
                .home
                .call_service("media_player", service, json!({ "entity_id": player }))
                .await
            {
                Ok(_) => performed += 1,
                Err(err) => {
                    warn!(player, performed, error = %err, "Coarse volume step failed");
                    break;
                }
            }
        }

        if performed == 0 {
            return Err(PipaError::Upstream("volume step control failed".to_string()));
        }
        Ok(())
    }

    async fn play(&self, player: &str, spoken_name: &str, query: &str) -> PipaResult<String> {
        if query.is_empty() {
            return self.simple_call(player, "media_play", "好的，继续播放。").await;
        }

        // "周杰伦的晴天" splits on the possessive into artist and track.
        let content = match query.split_once('的') {
            Some((artist, track)) if !artist.is_empty() && !track.is_empty() => {
                format!("{} {}", artist.trim(), track.trim())
            }
            _ => query.to_string(),
        };

        self.home
            .call_service(
                "media_player",
                "play_media",
                json!({
                    "entity_id": player,
                    "media_content_type": "music",
                    "media_content_id": content,
                }),
            )
            .await?;

        Ok(format!("好的，将在{}播放{}。", spoken_name, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pipa_core::{
        CalendarEvent, EntityState, ForecastEntry, ForecastGranularity, HomeApi,
    };
    use serde_json::Value;
    use std::collections::HashMap;

    struct NullHome;

    #[async_trait]
    impl HomeApi for NullHome {
        async fn entity_state(&self, _: &str) -> PipaResult<EntityState> {
            Err(PipaError::Upstream("no state".to_string()))
        }

        async fn call_service(&self, _: &str, _: &str, _: Value) -> PipaResult<Value> {
            Ok(Value::Null)
        }

        async fn forecast(
            &self,
            _: &str,
            _: ForecastGranularity,
        ) -> PipaResult<Vec<ForecastEntry>> {
            Ok(Vec::new())
        }

        async fn calendar_events(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> PipaResult<Vec<CalendarEvent>> {
            Ok(Vec::new())
        }
    }

    fn route() -> MusicRoute {
        let mut aliases = HashMap::new();
        aliases.insert("卧室".to_string(), "media_player.bedroom".to_string());
        aliases.insert("主卧室".to_string(), "media_player.master_bedroom".to_string());
        aliases.insert("客厅".to_string(), "media_player.living_room".to_string());
        let config = MusicConfig {
            default_player: Some("media_player.default".to_string()),
            room_aliases: aliases,
            ..MusicConfig::default()
        };
        MusicRoute::new(config, Arc::new(NullHome))
    }

    #[test]
    fn explicit_entity_id_wins() {
        let r = route();
        let (player, _) = r.target_player("在 media_player.kitchen 放歌").unwrap();
        assert_eq!(player, "media_player.kitchen");
    }

    #[test]
    fn longest_alias_match_wins() {
        let r = route();
        let (player, name) = r.target_player("在主卧室放点音乐").unwrap();
        assert_eq!(player, "media_player.master_bedroom");
        assert_eq!(name, "主卧室");
    }

    #[test]
    fn falls_back_to_default_player() {
        let r = route();
        let (player, _) = r.target_player("放首歌").unwrap();
        assert_eq!(player, "media_player.default");
    }

    #[test]
    fn parses_volume_commands() {
        let r = route();
        assert_eq!(r.parse_command("音量调到50"), MusicCommand::SetVolume(50));
        assert_eq!(r.parse_command("volume to 80"), MusicCommand::SetVolume(80));
        assert_eq!(r.parse_command("声音大一点"), MusicCommand::Louder);
        assert_eq!(r.parse_command("小声一点"), MusicCommand::Softer);
        assert_eq!(r.parse_command("静音"), MusicCommand::Mute);
        assert_eq!(r.parse_command("取消静音"), MusicCommand::Unmute);
    }

    #[test]
    fn parses_transport_commands() {
        let r = route();
        assert_eq!(r.parse_command("暂停"), MusicCommand::Pause);
        assert_eq!(r.parse_command("下一首"), MusicCommand::Next);
        assert_eq!(r.parse_command("上一首"), MusicCommand::Previous);
        assert_eq!(r.parse_command("继续放"), MusicCommand::Resume);
    }

    #[test]
    fn extracts_play_target_with_artist_split() {
        let r = route();
        match r.parse_command("我想在卧室听周杰伦的晴天") {
            MusicCommand::Play(query) => assert_eq!(query, "周杰伦的晴天"),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
