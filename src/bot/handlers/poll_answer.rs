use teloxide::prelude::*;
use teloxide::types::PollAnswer;

use crate::bot::handlers::BotDeps;

/// Feeds every incoming poll answer into the quiz core. Answers to polls
/// the core does not know (stale sessions, foreign polls) are dropped
/// there.
pub async fn poll_answer_handler(answer: PollAnswer, deps: BotDeps) -> ResponseResult<()> {
    let user = &answer.user;
    tracing::debug!(
        "Poll answer from {}({}) for poll {}",
        user.full_name(),
        user.id.0,
        answer.poll_id
    );
    deps.manager
        .handle_poll_answer(
            &answer.poll_id,
            user.id.0,
            &user.full_name(),
            &answer.option_ids,
        )
        .await;
    Ok(())
}
