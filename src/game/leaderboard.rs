//! Ranked standings and lobby roster projections derived from room state.

use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::GameMode,
    state::room::{Player, Room},
};

/// One ranked row of a classic-mode leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStanding {
    /// 1-based rank, consecutive.
    pub rank: usize,
    /// Display name.
    pub username: String,
    /// Total points over the counted questions.
    pub total_score: u32,
    /// Number of correct answers over the counted questions.
    pub correct_answers: usize,
    /// Mean response time over the counted answers; null when none.
    pub avg_response_ms: Option<u64>,
    /// Disconnected players keep their row and last known score.
    pub disconnected: bool,
}

/// One ranked row of a team-mode leaderboard.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamStanding {
    /// 1-based rank, consecutive.
    pub rank: usize,
    /// 1-based team identifier.
    pub team_id: u8,
    /// Display name of the team.
    pub team_name: String,
    /// Sum of member scores over the counted questions.
    pub total_score: u32,
    /// Sum of member correct answers.
    pub correct_answers: usize,
    /// Response-time mean weighted by each member's answered-question count,
    /// so members who answered more questions weigh more; null when the team
    /// answered nothing.
    pub avg_response_ms: Option<u64>,
    /// Number of players assigned to the team (disconnected included).
    pub player_count: usize,
}

/// Standings in the shape matching the room's mode.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum Leaderboard {
    /// Classic mode: one row per player.
    Players(Vec<PlayerStanding>),
    /// Team mode: one row per declared team.
    Teams(Vec<TeamStanding>),
}

impl Leaderboard {
    /// Number of ranked rows.
    pub fn len(&self) -> usize {
        match self {
            Leaderboard::Players(rows) => rows.len(),
            Leaderboard::Teams(rows) => rows.len(),
        }
    }

    /// Whether there are no rows at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lobby roster entry; connected players only.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    /// Display name.
    pub username: String,
    /// Whether this player holds the host seat.
    pub is_host: bool,
    /// Running total for the current run.
    pub total_score: u32,
    /// Assigned team (team mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u8>,
    /// Name of the assigned team (team mode only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
}

/// Aggregates accumulated over one player's counted answers.
struct AnswerTally {
    total_score: u32,
    correct: usize,
    answered: usize,
    elapsed_sum: u64,
}

/// Sum a player's answers, optionally restricted to a question-id subset.
///
/// With a subset the score is recomputed from stored records ("standings as of
/// question K"); without one the player's live running total is used verbatim.
fn tally_answers(player: &Player, allowed: Option<&HashSet<u32>>) -> AnswerTally {
    let mut tally = AnswerTally {
        total_score: 0,
        correct: 0,
        answered: 0,
        elapsed_sum: 0,
    };

    for (question_id, answer) in &player.answers {
        if let Some(allowed) = allowed {
            if !allowed.contains(question_id) {
                continue;
            }
        }
        tally.total_score += answer.points_awarded;
        tally.answered += 1;
        tally.elapsed_sum += answer.elapsed_ms;
        if answer.is_correct {
            tally.correct += 1;
        }
    }

    if allowed.is_none() {
        tally.total_score = player.total_score;
    }
    tally
}

fn mean_ms(elapsed_sum: u64, answered: usize) -> Option<u64> {
    (answered > 0).then(|| (elapsed_sum as f64 / answered as f64).round() as u64)
}

/// Build ranked standings for the room, in the shape matching its mode.
///
/// Rows are sorted by descending score. Ties keep the relative order of the
/// underlying player map (join order); any further tie-break policy is
/// deliberately unspecified. Disconnected players are retained with their
/// last known score, unlike the lobby roster.
pub fn build_leaderboard(room: &Room, allowed: Option<&HashSet<u32>>) -> Leaderboard {
    match room.mode {
        GameMode::Classic => Leaderboard::Players(build_player_standings(room, allowed)),
        GameMode::Team => Leaderboard::Teams(build_team_standings(room, allowed)),
    }
}

fn build_player_standings(room: &Room, allowed: Option<&HashSet<u32>>) -> Vec<PlayerStanding> {
    let mut standings: Vec<PlayerStanding> = room
        .players
        .values()
        .map(|player| {
            let tally = tally_answers(player, allowed);
            PlayerStanding {
                rank: 0,
                username: player.username.clone(),
                total_score: tally.total_score,
                correct_answers: tally.correct,
                avg_response_ms: mean_ms(tally.elapsed_sum, tally.answered),
                disconnected: player.disconnected,
            }
        })
        .collect();

    // Stable sort keeps join order for equal scores.
    standings.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    for (index, row) in standings.iter_mut().enumerate() {
        row.rank = index + 1;
    }
    standings
}

fn build_team_standings(room: &Room, allowed: Option<&HashSet<u32>>) -> Vec<TeamStanding> {
    // Every declared team gets a row, members or not.
    let mut standings: Vec<TeamStanding> = room
        .teams
        .iter()
        .map(|team| {
            let mut total_score = 0;
            let mut correct = 0;
            let mut answered = 0;
            let mut elapsed_sum = 0;
            let mut player_count = 0;

            for player in room.players.values() {
                if player.team_id != Some(team.id) {
                    continue;
                }
                player_count += 1;
                let tally = tally_answers(player, allowed);
                total_score += tally.total_score;
                correct += tally.correct;
                answered += tally.answered;
                elapsed_sum += tally.elapsed_sum;
            }

            TeamStanding {
                rank: 0,
                team_id: team.id,
                team_name: team.name.clone(),
                total_score,
                correct_answers: correct,
                avg_response_ms: mean_ms(elapsed_sum, answered),
                player_count,
            }
        })
        .collect();

    standings.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    for (index, row) in standings.iter_mut().enumerate() {
        row.rank = index + 1;
    }
    standings
}

/// Lobby roster: connected players only, with team names resolved.
pub fn build_player_list(room: &Room) -> Vec<PlayerSummary> {
    room.players
        .values()
        .filter(|player| !player.disconnected)
        .map(|player| PlayerSummary {
            username: player.username.clone(),
            is_host: player.is_host,
            total_score: player.total_score,
            team_id: player.team_id,
            team_name: player
                .team_id
                .and_then(|id| room.team_name(id))
                .map(str::to_string),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::{GameMode, GameRecord},
        state::room::{AnswerRecord, Player},
    };
    use std::time::SystemTime;
    use uuid::Uuid;

    fn room(mode: GameMode) -> Room {
        let game = GameRecord {
            id: Uuid::new_v4(),
            code: "AB2CD3".into(),
            mode,
            question_count: 3,
            time_per_question: 20,
            created_at: SystemTime::now(),
        };
        Room::new(&game, game.code.clone())
    }

    fn add_player(room: &mut Room, username: &str, team_id: Option<u8>) -> Uuid {
        let conn = Uuid::new_v4();
        room.players
            .insert(conn, Player::new(username.into(), false, team_id));
        conn
    }

    fn score_answer(
        room: &mut Room,
        conn: Uuid,
        question_id: u32,
        correct: bool,
        points: u32,
        elapsed_ms: u64,
    ) {
        let player = room.players.get_mut(&conn).unwrap();
        player.total_score += points;
        player.answers.insert(
            question_id,
            AnswerRecord {
                chosen_option: "A".into(),
                is_correct: correct,
                points_awarded: points,
                base_points: if correct { 100 } else { 0 },
                speed_bonus: points.saturating_sub(if correct { 100 } else { 0 }),
                elapsed_ms,
                suspicious: elapsed_ms < 1000,
            },
        );
    }

    #[test]
    fn ranks_are_descending_and_consecutive() {
        let mut room = room(GameMode::Classic);
        let low = add_player(&mut room, "low", None);
        let high = add_player(&mut room, "high", None);
        let mid = add_player(&mut room, "mid", None);
        score_answer(&mut room, low, 1, true, 100, 19_000);
        score_answer(&mut room, high, 1, true, 150, 100);
        score_answer(&mut room, mid, 1, true, 120, 10_000);

        let Leaderboard::Players(rows) = build_leaderboard(&room, None) else {
            panic!("classic room must produce player standings");
        };

        let order: Vec<_> = rows.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(order, ["high", "mid", "low"]);
        let ranks: Vec<_> = rows.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, [1, 2, 3]);
    }

    #[test]
    fn ties_keep_join_order() {
        // Tie-break policy beyond join order is deliberately unspecified;
        // this pins only the stability of the sort.
        let mut room = room(GameMode::Classic);
        let first = add_player(&mut room, "first", None);
        let second = add_player(&mut room, "second", None);
        score_answer(&mut room, first, 1, true, 100, 5_000);
        score_answer(&mut room, second, 1, true, 100, 5_000);

        let Leaderboard::Players(rows) = build_leaderboard(&room, None) else {
            panic!("classic room must produce player standings");
        };
        assert_eq!(rows[0].username, "first");
        assert_eq!(rows[1].username, "second");
    }

    #[test]
    fn disconnected_players_keep_their_row() {
        let mut room = room(GameMode::Classic);
        let gone = add_player(&mut room, "gone", None);
        add_player(&mut room, "here", None);
        score_answer(&mut room, gone, 1, true, 150, 2_000);
        room.players.get_mut(&gone).unwrap().disconnected = true;

        let Leaderboard::Players(rows) = build_leaderboard(&room, None) else {
            panic!("classic room must produce player standings");
        };
        assert_eq!(rows[0].username, "gone");
        assert_eq!(rows[0].total_score, 150);
        assert!(rows[0].disconnected);

        // The lobby roster drops them entirely.
        let roster = build_player_list(&room);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].username, "here");
    }

    #[test]
    fn allowed_subset_recomputes_scores() {
        let mut room = room(GameMode::Classic);
        let conn = add_player(&mut room, "ada", None);
        score_answer(&mut room, conn, 1, true, 150, 1_000);
        score_answer(&mut room, conn, 2, true, 120, 8_000);
        score_answer(&mut room, conn, 3, false, 0, 3_000);

        let allowed: HashSet<u32> = [1, 2].into();
        let Leaderboard::Players(rows) = build_leaderboard(&room, Some(&allowed)) else {
            panic!("classic room must produce player standings");
        };
        assert_eq!(rows[0].total_score, 270);
        assert_eq!(rows[0].correct_answers, 2);
        assert_eq!(rows[0].avg_response_ms, Some(4_500));
    }

    #[test]
    fn average_is_null_without_answers() {
        let mut room = room(GameMode::Classic);
        add_player(&mut room, "quiet", None);

        let Leaderboard::Players(rows) = build_leaderboard(&room, None) else {
            panic!("classic room must produce player standings");
        };
        assert_eq!(rows[0].avg_response_ms, None);
        assert_eq!(rows[0].total_score, 0);
    }

    #[test]
    fn team_rows_aggregate_members() {
        let mut room = room(GameMode::Team);
        room.declare_teams(2);
        let a1 = add_player(&mut room, "a1", Some(1));
        let a2 = add_player(&mut room, "a2", Some(1));
        let b1 = add_player(&mut room, "b1", Some(2));
        score_answer(&mut room, a1, 1, true, 150, 1_000);
        score_answer(&mut room, a1, 2, true, 110, 15_000);
        score_answer(&mut room, a2, 1, false, 0, 4_000);
        score_answer(&mut room, b1, 1, true, 130, 5_000);

        let Leaderboard::Teams(rows) = build_leaderboard(&room, None) else {
            panic!("team room must produce team standings");
        };
        assert_eq!(rows[0].team_id, 1);
        assert_eq!(rows[0].total_score, 260);
        assert_eq!(rows[0].correct_answers, 2);
        assert_eq!(rows[0].player_count, 2);
        // Weighted by answered count: (1000 + 15000 + 4000) / 3.
        assert_eq!(rows[0].avg_response_ms, Some(6_667));

        assert_eq!(rows[1].team_id, 2);
        assert_eq!(rows[1].total_score, 130);
    }

    #[test]
    fn declared_team_without_members_still_ranks() {
        let mut room = room(GameMode::Team);
        room.declare_teams(3);
        let a = add_player(&mut room, "a", Some(1));
        score_answer(&mut room, a, 1, true, 150, 1_000);

        let Leaderboard::Teams(rows) = build_leaderboard(&room, None) else {
            panic!("team room must produce team standings");
        };
        assert_eq!(rows.len(), 3);
        let empty = rows.iter().find(|r| r.team_id == 3).unwrap();
        assert_eq!(empty.total_score, 0);
        assert_eq!(empty.player_count, 0);
        assert_eq!(empty.avg_response_ms, None);
    }

    #[test]
    fn roster_resolves_team_names() {
        let mut room = room(GameMode::Team);
        room.declare_teams(2);
        add_player(&mut room, "ada", Some(2));

        let roster = build_player_list(&room);
        assert_eq!(roster[0].team_id, Some(2));
        assert_eq!(roster[0].team_name.as_deref(), Some("Team 2"));
    }
}
