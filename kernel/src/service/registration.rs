use std::sync::Arc;

use derive_new::new;
use shared::error::{AppError, AppResult};

use crate::{
    model::{
        auth::CallerIdentity,
        event::EventStatus,
        id::{EventId, UserId},
        registration::{ClaimResult, RegistrationState, WaitlistEntry},
    },
    notifier::{Notification, NotificationKind, Notifier},
    repository::registration::RegistrationRepository,
};

/// 登録状態マシン。
///
/// (利用者, イベント) の組に対する登録要求の成否・キャンセル待ち入り・
/// 繰り上げを決定する。永続化の原子性は RegistrationRepository 側が
/// 保証し、本サービスは遷移の順序と通知の送出を担う
#[derive(new)]
pub struct RegistrationService {
    registration_repository: Arc<dyn RegistrationRepository>,
    notifier: Arc<dyn Notifier>,
}

impl RegistrationService {
    /// 登録要求。空き枠があれば登録、満員ならキャンセル待ちに入る
    pub async fn request_registration(
        &self,
        caller: &CallerIdentity,
        event_id: EventId,
    ) -> AppResult<RegistrationState> {
        match self
            .registration_repository
            .try_claim_spot(event_id, caller.user_id)
            .await?
        {
            ClaimResult::Claimed => {
                self.send_notification(Notification::new(
                    caller.user_id,
                    event_id,
                    NotificationKind::Registered,
                ))
                .await;
                Ok(RegistrationState::Registered)
            }
            // 登録済みの再送は二重登録にせず、現在の状態を返す
            ClaimResult::AlreadyRegistered => Ok(RegistrationState::Registered),
            ClaimResult::Full => {
                self.registration_repository
                    .enqueue_waitlist(event_id, caller.user_id)
                    .await?;
                Ok(RegistrationState::Waitlisted)
            }
        }
    }

    /// 自発的な登録取り消し。登録が無ければ何もしない
    pub async fn withdraw_registration(
        &self,
        caller: &CallerIdentity,
        event_id: EventId,
    ) -> AppResult<()> {
        self.remove_registration(event_id, caller.user_id).await
    }

    /// キャンセル待ちから自発的に抜ける
    pub async fn leave_waitlist(
        &self,
        caller: &CallerIdentity,
        event_id: EventId,
    ) -> AppResult<()> {
        self.registration_repository
            .dequeue_waitlist(event_id, caller.user_id)
            .await?;
        Ok(())
    }

    /// 管理者による強制取り消し。権限判定は対象者ではなく呼び出し元に対して行う
    pub async fn force_remove(
        &self,
        caller: &CallerIdentity,
        target_user: UserId,
        event_id: EventId,
    ) -> AppResult<()> {
        if !caller.is_admin() {
            return Err(AppError::UnauthorizedError);
        }
        self.remove_registration(event_id, target_user).await
    }

    /// 空き枠 1 つにつき最大 1 名をキャンセル待ちから繰り上げる
    pub async fn promote_next(&self, event_id: EventId) -> AppResult<()> {
        if let Some(promoted) = self
            .registration_repository
            .promote_oldest(event_id)
            .await?
        {
            self.send_notification(Notification::new(
                promoted,
                event_id,
                NotificationKind::Promoted,
            ))
            .await;
        }
        Ok(())
    }

    /// キャンセル待ちの一覧を FIFO 順で返す（管理者用）
    pub async fn waitlist_roster(
        &self,
        caller: &CallerIdentity,
        event_id: EventId,
    ) -> AppResult<Vec<WaitlistEntry>> {
        if !caller.is_admin() {
            return Err(AppError::UnauthorizedError);
        }
        self.registration_repository.find_waitlist(event_id).await
    }

    pub async fn event_status(
        &self,
        caller: &CallerIdentity,
        event_id: EventId,
    ) -> AppResult<EventStatus> {
        self.registration_repository
            .find_status(event_id, caller.user_id)
            .await
    }

    async fn remove_registration(&self, event_id: EventId, user_id: UserId) -> AppResult<()> {
        // 枠の解放がコミットされてから繰り上げを行う。
        // 解放が起きなかった場合（登録が無かった場合）は繰り上げもしない
        let released = self
            .registration_repository
            .release_spot(event_id, user_id)
            .await?;
        if released {
            self.promote_next(event_id).await?;
        }
        Ok(())
    }

    async fn send_notification(&self, notification: Notification) {
        // 通知は後処理の副作用であり、失敗しても操作自体は成立させる
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!(
                error.message = %e,
                kind = ?notification.kind,
                user_id = %notification.user_id,
                event_id = %notification.event_id,
                "通知の投入に失敗しました"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::{Barrier, Mutex};

    use super::*;
    use crate::model::registration::WaitlistEntry;
    use crate::model::{id::WaitlistEntryId, role::Role};

    #[derive(Default)]
    struct State {
        // event_id -> (filled, capacity)
        spots: HashMap<EventId, (i32, i32)>,
        registrations: HashSet<(EventId, UserId)>,
        // 挿入順 = FIFO 順
        waitlist: Vec<(EventId, UserId)>,
    }

    struct InMemoryRegistrationRepository {
        state: Mutex<State>,
    }

    impl InMemoryRegistrationRepository {
        fn with_event(event_id: EventId, capacity: i32) -> Self {
            let mut state = State::default();
            state.spots.insert(event_id, (0, capacity));
            Self {
                state: Mutex::new(state),
            }
        }

        async fn filled(&self, event_id: EventId) -> i32 {
            self.state.lock().await.spots[&event_id].0
        }

        /// 管理者による定員変更に相当する
        async fn set_capacity(&self, event_id: EventId, capacity: i32) {
            let mut state = self.state.lock().await;
            let (filled, _) = state.spots[&event_id];
            state.spots.insert(event_id, (filled, capacity));
        }

        async fn registration_count(&self, event_id: EventId) -> usize {
            self.state
                .lock()
                .await
                .registrations
                .iter()
                .filter(|(e, _)| *e == event_id)
                .count()
        }

        async fn is_registered(&self, event_id: EventId, user_id: UserId) -> bool {
            self.state
                .lock()
                .await
                .registrations
                .contains(&(event_id, user_id))
        }

        async fn is_waitlisted(&self, event_id: EventId, user_id: UserId) -> bool {
            self.state
                .lock()
                .await
                .waitlist
                .contains(&(event_id, user_id))
        }
    }

    #[async_trait]
    impl RegistrationRepository for InMemoryRegistrationRepository {
        async fn try_claim_spot(
            &self,
            event_id: EventId,
            user_id: UserId,
        ) -> AppResult<ClaimResult> {
            let mut state = self.state.lock().await;
            if state.registrations.contains(&(event_id, user_id)) {
                return Ok(ClaimResult::AlreadyRegistered);
            }
            let (filled, capacity) = *state
                .spots
                .get(&event_id)
                .ok_or_else(|| AppError::EntityNotFound("event not found".into()))?;
            if filled >= capacity {
                return Ok(ClaimResult::Full);
            }
            state.registrations.insert((event_id, user_id));
            state.spots.insert(event_id, (filled + 1, capacity));
            // 待ちから直接登録できた場合はエントリを消す
            state.waitlist.retain(|entry| *entry != (event_id, user_id));
            Ok(ClaimResult::Claimed)
        }

        async fn release_spot(&self, event_id: EventId, user_id: UserId) -> AppResult<bool> {
            let mut state = self.state.lock().await;
            if !state.registrations.remove(&(event_id, user_id)) {
                return Ok(false);
            }
            let (filled, capacity) = state.spots[&event_id];
            state.spots.insert(event_id, (0.max(filled - 1), capacity));
            Ok(true)
        }

        async fn enqueue_waitlist(&self, event_id: EventId, user_id: UserId) -> AppResult<()> {
            let mut state = self.state.lock().await;
            if !state.waitlist.contains(&(event_id, user_id)) {
                state.waitlist.push((event_id, user_id));
            }
            Ok(())
        }

        async fn dequeue_waitlist(&self, event_id: EventId, user_id: UserId) -> AppResult<bool> {
            let mut state = self.state.lock().await;
            let before = state.waitlist.len();
            state.waitlist.retain(|entry| *entry != (event_id, user_id));
            Ok(state.waitlist.len() < before)
        }

        async fn promote_oldest(&self, event_id: EventId) -> AppResult<Option<UserId>> {
            let mut state = self.state.lock().await;
            let (filled, capacity) = state.spots[&event_id];
            if filled >= capacity {
                return Ok(None);
            }
            let Some(pos) = state.waitlist.iter().position(|(e, _)| *e == event_id) else {
                return Ok(None);
            };
            let (_, user_id) = state.waitlist.remove(pos);
            state.registrations.insert((event_id, user_id));
            state.spots.insert(event_id, (filled + 1, capacity));
            Ok(Some(user_id))
        }

        async fn find_status(&self, event_id: EventId, user_id: UserId) -> AppResult<EventStatus> {
            let state = self.state.lock().await;
            let (filled, capacity) = state.spots[&event_id];
            Ok(EventStatus {
                filled,
                capacity,
                is_registered: state.registrations.contains(&(event_id, user_id)),
                is_waitlisted: state.waitlist.contains(&(event_id, user_id)),
            })
        }

        async fn find_waitlist(&self, event_id: EventId) -> AppResult<Vec<WaitlistEntry>> {
            let state = self.state.lock().await;
            Ok(state
                .waitlist
                .iter()
                .filter(|(e, _)| *e == event_id)
                .map(|(e, u)| WaitlistEntry {
                    waitlist_id: WaitlistEntryId::new(),
                    event_id: *e,
                    user_id: *u,
                    joined_at: Utc::now(),
                })
                .collect())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: StdMutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn sent_to(&self, user_id: UserId) -> Vec<NotificationKind> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|n| n.user_id == user_id)
                .map(|n| n.kind)
                .collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: Notification) -> AppResult<()> {
            self.sent.lock().unwrap().push(notification);
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _notification: Notification) -> AppResult<()> {
            Err(AppError::ExternalServiceError("mail queue is down".into()))
        }
    }

    fn member(user_id: UserId) -> CallerIdentity {
        CallerIdentity::new(user_id, Role::User)
    }

    fn admin(user_id: UserId) -> CallerIdentity {
        CallerIdentity::new(user_id, Role::Admin)
    }

    struct Fixture {
        service: RegistrationService,
        repository: Arc<InMemoryRegistrationRepository>,
        notifier: Arc<RecordingNotifier>,
        event_id: EventId,
    }

    fn fixture(capacity: i32) -> Fixture {
        let event_id = EventId::new();
        let repository = Arc::new(InMemoryRegistrationRepository::with_event(
            event_id, capacity,
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let service = RegistrationService::new(repository.clone(), notifier.clone());
        Fixture {
            service,
            repository,
            notifier,
            event_id,
        }
    }

    #[tokio::test]
    async fn basic_fill_and_waitlist_scenario() -> AppResult<()> {
        let f = fixture(2);
        let (x, y, z) = (UserId::new(), UserId::new(), UserId::new());

        assert_eq!(
            f.service.request_registration(&member(x), f.event_id).await?,
            RegistrationState::Registered
        );
        assert_eq!(f.repository.filled(f.event_id).await, 1);

        assert_eq!(
            f.service.request_registration(&member(y), f.event_id).await?,
            RegistrationState::Registered
        );
        assert_eq!(f.repository.filled(f.event_id).await, 2);

        assert_eq!(
            f.service.request_registration(&member(z), f.event_id).await?,
            RegistrationState::Waitlisted
        );
        // 満員での要求は台帳を変更しない
        assert_eq!(f.repository.filled(f.event_id).await, 2);

        f.service.withdraw_registration(&member(x), f.event_id).await?;

        // Z が繰り上がり、定員はちょうど埋まる
        assert!(f.repository.is_registered(f.event_id, z).await);
        assert!(!f.repository.is_waitlisted(f.event_id, z).await);
        assert_eq!(f.repository.filled(f.event_id).await, 2);
        assert_eq!(f.notifier.sent_to(z), vec![NotificationKind::Promoted]);
        Ok(())
    }

    #[tokio::test]
    async fn promotion_is_fifo_ordered() -> AppResult<()> {
        let f = fixture(2);
        let (p, q) = (UserId::new(), UserId::new());
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());

        f.service.request_registration(&member(p), f.event_id).await?;
        f.service.request_registration(&member(q), f.event_id).await?;
        for user in [a, b, c] {
            assert_eq!(
                f.service
                    .request_registration(&member(user), f.event_id)
                    .await?,
                RegistrationState::Waitlisted
            );
        }

        f.service.withdraw_registration(&member(p), f.event_id).await?;
        assert!(f.repository.is_registered(f.event_id, a).await);
        assert!(f.repository.is_waitlisted(f.event_id, b).await);

        f.service.withdraw_registration(&member(q), f.event_id).await?;
        assert!(f.repository.is_registered(f.event_id, b).await);
        assert!(f.repository.is_waitlisted(f.event_id, c).await);

        assert_eq!(f.notifier.sent_to(a), vec![NotificationKind::Promoted]);
        assert_eq!(f.notifier.sent_to(b), vec![NotificationKind::Promoted]);
        assert_eq!(f.notifier.sent_to(c), Vec::<NotificationKind>::new());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_never_overshoot_capacity() -> AppResult<()> {
        const CAPACITY: i32 = 3;
        const REQUESTS: usize = 10;

        let f = fixture(CAPACITY);
        let service = Arc::new(f.service);
        let barrier = Arc::new(Barrier::new(REQUESTS));

        let mut handles = Vec::with_capacity(REQUESTS);
        for _ in 0..REQUESTS {
            let service = service.clone();
            let barrier = barrier.clone();
            let event_id = f.event_id;
            handles.push(tokio::spawn(async move {
                let user = UserId::new();
                barrier.wait().await;
                service.request_registration(&member(user), event_id).await
            }));
        }

        let mut registered = 0;
        let mut waitlisted = 0;
        for handle in handles {
            match handle.await.unwrap()? {
                RegistrationState::Registered => registered += 1,
                RegistrationState::Waitlisted => waitlisted += 1,
                RegistrationState::Unregistered => unreachable!(),
            }
        }

        assert_eq!(registered, CAPACITY as usize);
        assert_eq!(waitlisted, REQUESTS - CAPACITY as usize);
        // 台帳と登録レコード数は一致し、定員を超えない
        assert_eq!(f.repository.filled(f.event_id).await, CAPACITY);
        assert_eq!(
            f.repository.registration_count(f.event_id).await,
            CAPACITY as usize
        );
        Ok(())
    }

    #[tokio::test]
    async fn withdrawal_is_idempotent() -> AppResult<()> {
        let f = fixture(1);
        let (x, w) = (UserId::new(), UserId::new());

        f.service.request_registration(&member(x), f.event_id).await?;
        f.service.request_registration(&member(w), f.event_id).await?;
        assert!(f.repository.is_waitlisted(f.event_id, w).await);

        f.service.withdraw_registration(&member(x), f.event_id).await?;
        assert!(f.repository.is_registered(f.event_id, w).await);
        assert_eq!(f.repository.filled(f.event_id).await, 1);

        // 2 回目の取り消しは何も起こさない。カウンタも昇格も動かない
        f.service.withdraw_registration(&member(x), f.event_id).await?;
        assert_eq!(f.repository.filled(f.event_id).await, 1);
        assert_eq!(f.repository.registration_count(f.event_id).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn repeated_request_while_registered_is_noop() -> AppResult<()> {
        let f = fixture(2);
        let x = UserId::new();

        f.service.request_registration(&member(x), f.event_id).await?;
        let state = f.service.request_registration(&member(x), f.event_id).await?;

        assert_eq!(state, RegistrationState::Registered);
        assert_eq!(f.repository.filled(f.event_id).await, 1);
        assert_eq!(f.repository.registration_count(f.event_id).await, 1);
        // 通知は最初の登録の 1 回だけ
        assert_eq!(f.notifier.sent_to(x), vec![NotificationKind::Registered]);
        Ok(())
    }

    #[tokio::test]
    async fn registered_and_waitlisted_are_mutually_exclusive() -> AppResult<()> {
        let f = fixture(1);
        let (x, y) = (UserId::new(), UserId::new());

        f.service.request_registration(&member(x), f.event_id).await?;
        f.service.request_registration(&member(y), f.event_id).await?;

        let status_x = f.service.event_status(&member(x), f.event_id).await?;
        assert!(status_x.is_registered && !status_x.is_waitlisted);

        let status_y = f.service.event_status(&member(y), f.event_id).await?;
        assert!(!status_y.is_registered && status_y.is_waitlisted);

        // 繰り上げ後も同時に両方の状態になることはない
        f.service.withdraw_registration(&member(x), f.event_id).await?;
        let status_y = f.service.event_status(&member(y), f.event_id).await?;
        assert!(status_y.is_registered && !status_y.is_waitlisted);
        Ok(())
    }

    #[tokio::test]
    async fn leave_waitlist_dequeues_without_touching_spots() -> AppResult<()> {
        let f = fixture(1);
        let (x, w) = (UserId::new(), UserId::new());

        f.service.request_registration(&member(x), f.event_id).await?;
        f.service.request_registration(&member(w), f.event_id).await?;

        f.service.leave_waitlist(&member(w), f.event_id).await?;
        assert!(!f.repository.is_waitlisted(f.event_id, w).await);
        assert_eq!(f.repository.filled(f.event_id).await, 1);

        // 並んでいない状態で抜けても失敗しない
        f.service.leave_waitlist(&member(w), f.event_id).await?;
        Ok(())
    }

    #[tokio::test]
    async fn force_remove_requires_admin_caller() -> AppResult<()> {
        let f = fixture(1);
        let (x, intruder) = (UserId::new(), UserId::new());

        f.service.request_registration(&member(x), f.event_id).await?;

        let result = f
            .service
            .force_remove(&member(intruder), x, f.event_id)
            .await;
        assert!(matches!(result, Err(AppError::UnauthorizedError)));
        // 拒否された操作は状態を一切変えない
        assert!(f.repository.is_registered(f.event_id, x).await);
        assert_eq!(f.repository.filled(f.event_id).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn force_remove_by_admin_promotes_next_in_line() -> AppResult<()> {
        let f = fixture(1);
        let (x, w, op) = (UserId::new(), UserId::new(), UserId::new());

        f.service.request_registration(&member(x), f.event_id).await?;
        f.service.request_registration(&member(w), f.event_id).await?;

        f.service.force_remove(&admin(op), x, f.event_id).await?;

        assert!(!f.repository.is_registered(f.event_id, x).await);
        assert!(f.repository.is_registered(f.event_id, w).await);
        assert_eq!(f.notifier.sent_to(w), vec![NotificationKind::Promoted]);
        Ok(())
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_registration() -> AppResult<()> {
        let event_id = EventId::new();
        let repository = Arc::new(InMemoryRegistrationRepository::with_event(event_id, 1));
        let service = RegistrationService::new(repository.clone(), Arc::new(FailingNotifier));
        let x = UserId::new();

        let state = service.request_registration(&member(x), event_id).await?;
        assert_eq!(state, RegistrationState::Registered);
        assert!(repository.is_registered(event_id, x).await);
        Ok(())
    }

    #[tokio::test]
    async fn promote_next_on_empty_waitlist_is_noop() -> AppResult<()> {
        let f = fixture(2);
        f.service.promote_next(f.event_id).await?;
        assert_eq!(f.repository.filled(f.event_id).await, 0);
        assert!(f.notifier.sent.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn claiming_a_freed_spot_removes_the_waitlist_entry() -> AppResult<()> {
        let f = fixture(1);
        let (x, w) = (UserId::new(), UserId::new());

        f.service.request_registration(&member(x), f.event_id).await?;
        assert_eq!(
            f.service.request_registration(&member(w), f.event_id).await?,
            RegistrationState::Waitlisted
        );

        // 繰り上げを経ずに空き枠ができた状態（定員の引き上げ）で
        // 並んでいた本人が再要求する
        f.repository.set_capacity(f.event_id, 2).await;
        assert_eq!(
            f.service.request_registration(&member(w), f.event_id).await?,
            RegistrationState::Registered
        );

        // 登録と待ちが同時に立つことはない
        assert!(f.repository.is_registered(f.event_id, w).await);
        assert!(!f.repository.is_waitlisted(f.event_id, w).await);

        // 残った待ちエントリから二重登録の昇格が起きないこと
        f.service.withdraw_registration(&member(x), f.event_id).await?;
        assert_eq!(f.repository.registration_count(f.event_id).await, 1);
        assert_eq!(f.repository.filled(f.event_id).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn waitlist_roster_is_admin_only_and_fifo() -> AppResult<()> {
        let f = fixture(1);
        let (x, a, b, op) = (UserId::new(), UserId::new(), UserId::new(), UserId::new());

        f.service.request_registration(&member(x), f.event_id).await?;
        f.service.request_registration(&member(a), f.event_id).await?;
        f.service.request_registration(&member(b), f.event_id).await?;

        let result = f.service.waitlist_roster(&member(x), f.event_id).await;
        assert!(matches!(result, Err(AppError::UnauthorizedError)));

        let roster = f.service.waitlist_roster(&admin(op), f.event_id).await?;
        let users: Vec<UserId> = roster.into_iter().map(|entry| entry.user_id).collect();
        assert_eq!(users, vec![a, b]);
        Ok(())
    }
}
