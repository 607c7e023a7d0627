//! # Event Intake Service
//!
//! Implements [`EventIntakeApi`]: envelope checks, per-family normalizers,
//! application to the import queue and frequency log updates.

use std::collections::HashSet;

use rp_01_message_envelope::{Envelope, EnvelopeApi, PlainBody, ValidatedEnvelope};
use rp_02_event_health::EventHealthApi;
use rp_03_import_queue::{ImportQueueApi, UserUpdate};
use serde_json::Value;
use shared_types::{Enrollment, Priority};
use tracing::{debug, error, info, warn};

use crate::domain::family::EventFamily;
use crate::domain::identity::{is_valid_login_id, is_valid_net_id, normalize_reg_id};
use crate::domain::outcome::SkipReason;
use crate::domain::report::{GatherOptions, GatherReport, MessageOutcome};
use crate::error::IntakeError;
use crate::normalizer::group::{route, GroupAction, GroupDocument, GroupRoute, LoginGroups};
use crate::normalizer::instructor::{InstructorChange, InstructorEvent};
use crate::normalizer::person::PersonChange;
use crate::normalizer::{enrollment, person};
use crate::ports::inbound::EventIntakeApi;
use crate::ports::outbound::{MessageQueue, RosterError, RosterService};

pub struct EventIntake<E, Q, H, R>
where
    E: EnvelopeApi,
    Q: ImportQueueApi,
    H: EventHealthApi,
    R: RosterService,
{
    envelopes: E,
    queue: Q,
    health: H,
    roster: R,
    login_groups: LoginGroups,
}

impl<E, Q, H, R> EventIntake<E, Q, H, R>
where
    E: EnvelopeApi,
    Q: ImportQueueApi,
    H: EventHealthApi,
    R: RosterService,
{
    pub fn new(envelopes: E, queue: Q, health: H, roster: R) -> Self {
        Self {
            envelopes,
            queue,
            health,
            roster,
            login_groups: LoginGroups::default(),
        }
    }

    pub fn with_login_groups(mut self, login_groups: LoginGroups) -> Self {
        self.login_groups = login_groups;
        self
    }

    pub fn envelopes(&self) -> &E {
        &self.envelopes
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    pub fn health(&self) -> &H {
        &self.health
    }

    pub fn roster(&self) -> &R {
        &self.roster
    }

    fn record(&self, family: EventFamily, events: u64) -> Result<MessageOutcome, IntakeError> {
        if events == 0 {
            return Ok(MessageOutcome::Ignored);
        }
        self.health.record_events(family.log_source(), events)?;
        Ok(MessageOutcome::Applied(events))
    }

    fn apply_enrollments(
        &self,
        enrollments: impl IntoIterator<Item = Enrollment>,
    ) -> Result<u64, IntakeError> {
        let mut changed = 0;
        for enrollment in enrollments {
            if self.queue.apply_enrollment(enrollment)?.outcome.changed() {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn decrypted(&self, envelope: &ValidatedEnvelope) -> Result<Option<Value>, IntakeError> {
        match self.envelopes.decrypt(envelope).await? {
            PlainBody::Json(body) => Ok(Some(body)),
            PlainBody::Empty => Ok(None),
        }
    }

    /// `Ok(false)` when the roster says to skip, logged with `skip`.
    fn roster_check(
        &self,
        check: Result<bool, RosterError>,
        skip: SkipReason,
        section: &str,
    ) -> Result<bool, IntakeError> {
        match check {
            Ok(true) => Ok(true),
            Ok(false) => {
                info!("INSTRUCTOR: {skip} section: {section}");
                Ok(false)
            }
            Err(RosterError::NotFound(what)) => {
                warn!("INSTRUCTOR: ERROR Term ({what}) section: {section}");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn process_instructor(&self, change: InstructorChange, body: &Value) -> Result<u64, IntakeError> {
        let event = InstructorEvent::parse(body).map_err(IntakeError::Payload)?;
        let section = event.section.to_string();

        let active = self
            .roster
            .is_active_term(event.section.year, event.section.quarter)
            .await;
        if !self.roster_check(active, SkipReason::InactiveTerm, &section)? {
            return Ok(0);
        }
        let ready = self.roster.is_time_schedule_ready(&event.section).await;
        if !self.roster_check(ready, SkipReason::TimeScheduleNotReady, &section)? {
            return Ok(0);
        }

        self.apply_enrollments(event.enrollments(change))
    }

    fn process_person(&self, body: &Value) -> Result<u64, IntakeError> {
        match person::normalize(body).map_err(IntakeError::Payload)? {
            PersonChange::MissingNetId { reg_id } => {
                info!("PERSON: {}, uwregid: {reg_id}", SkipReason::MissingNetId);
                Ok(0)
            }
            PersonChange::Unchanged => {
                debug!("PERSON: no identity change");
                Ok(0)
            }
            PersonChange::Changed { net_id, reg_id } => {
                let reg_id = normalize_reg_id(&reg_id).unwrap_or(reg_id);
                match self.queue.raise_user(&net_id, &reg_id, Priority::High)? {
                    UserUpdate::Unknown => {
                        info!("PERSON: IGNORE unknown user, uwnetid: {net_id}, uwregid: {reg_id}")
                    }
                    _ => info!("PERSON: ACCEPT, uwnetid: {net_id}, uwregid: {reg_id}"),
                }
                Ok(1)
            }
        }
    }

    async fn process_group(&self, envelope: &ValidatedEnvelope) -> Result<MessageOutcome, IntakeError> {
        let context = envelope.envelope().group_context()?;
        let action = GroupAction::parse(&context.action);
        let known = self.queue.is_known_group(&context.group)?;

        let Some(route) = route(&context.group, &self.login_groups, known) else {
            debug!("GROUP: IGNORE {action} for unmanaged group {}", context.group);
            return Ok(MessageOutcome::Ignored);
        };
        let Some(body) = self.decrypted(envelope).await? else {
            return Ok(MessageOutcome::Empty);
        };
        let document = GroupDocument::parse(&body).map_err(IntakeError::Payload)?;

        let count = match &action {
            GroupAction::NoAction => 0,
            GroupAction::Unknown(name) => {
                info!("GROUP: UNKNOWN {name} for {}", context.group);
                0
            }
            _ => match &route {
                GroupRoute::Known => self.known_group(&action, &document, &context.group)?,
                GroupRoute::Course { course_id } => {
                    info!("GROUP: IGNORE course group {action}: {course_id}");
                    0
                }
                login => self.login_group(login, &action, &document).await?,
            },
        };
        self.record(EventFamily::Group, count)
    }

    fn known_group(&self, action: &GroupAction, document: &GroupDocument, group: &str) -> Result<u64, IntakeError> {
        let group_id = document.group_id(group);
        match action {
            GroupAction::UpdateMembers => {
                let members = document
                    .add_members
                    .iter()
                    .chain(&document.delete_members)
                    .filter(|m| is_valid_login_id(m))
                    .count() as u64;
                if members > 0 {
                    self.queue.raise_group(group_id, Priority::High)?;
                    info!("GROUP: UPDATE membership for {group_id}");
                }
                Ok(members)
            }
            GroupAction::DeleteGroup => {
                self.queue.delete_group(group_id)?;
                info!("GROUP: DELETE {group_id}");
                Ok(1)
            }
            GroupAction::ChangeSubjectName => {
                let subject = document
                    .subject
                    .as_ref()
                    .ok_or_else(|| IntakeError::Payload("change-subject-name without subject".into()))?;
                self.queue.rename_group(&subject.old_name, &subject.new_name)?;
                info!(
                    "GROUP: UPDATE change-subject-name {} to {}",
                    subject.old_name, subject.new_name
                );
                Ok(1)
            }
            _ => {
                info!("GROUP: IGNORE {action} for {group_id}");
                Ok(0)
            }
        }
    }

    async fn login_group(
        &self,
        route: &GroupRoute,
        action: &GroupAction,
        document: &GroupDocument,
    ) -> Result<u64, IntakeError> {
        if *action != GroupAction::UpdateMembers {
            info!("GROUP: IGNORE {action} for {route}");
            return Ok(0);
        }
        let mut added = 0;
        for login in document.add_members.iter().filter(|m| is_valid_net_id(m)) {
            match self.roster.person_by_login(login).await? {
                Some(user) => {
                    self.queue.add_user(user, Priority::High)?;
                    added += 1;
                }
                None => info!("GROUP: IGNORE unknown login {login} in {route}"),
            }
        }

        // Leaving the affiliate or sponsored group matters only for someone
        // still in the student group and not covered by the other one.
        let other = match route {
            GroupRoute::AffiliateLogin => Some(&self.login_groups.sponsored),
            GroupRoute::SponsoredLogin => Some(&self.login_groups.affiliate),
            _ => None,
        };
        if let Some(other) = other {
            for login in document.delete_members.iter().filter(|m| is_valid_net_id(m)) {
                if !self.roster.is_group_member(&self.login_groups.student, login).await?
                    || self.roster.is_group_member(other, login).await?
                {
                    continue;
                }
                match self.roster.person_by_login(login).await? {
                    Some(user) => {
                        info!("GROUP: {login} left {route}, re-provisioning");
                        self.queue.add_user(user, Priority::High)?;
                        added += 1;
                    }
                    None => info!("GROUP: IGNORE unknown login {login} in {route}"),
                }
            }
        }
        Ok(added)
    }
}

#[async_trait::async_trait]
impl<E, Q, H, R> EventIntakeApi for EventIntake<E, Q, H, R>
where
    E: EnvelopeApi,
    Q: ImportQueueApi,
    H: EventHealthApi,
    R: RosterService,
{
    async fn process(&self, family: EventFamily, raw: &str) -> Result<MessageOutcome, IntakeError> {
        let envelope = Envelope::parse(raw)?;
        let validated = self.envelopes.validate(envelope, &family.profile()).await?;
        if family == EventFamily::Group {
            return self.process_group(&validated).await;
        }

        let Some(body) = self.decrypted(&validated).await? else {
            return Ok(MessageOutcome::Empty);
        };
        let events = match family {
            EventFamily::Enrollment => self.apply_enrollments(
                enrollment::normalize(&body)
                    .into_iter()
                    .filter_map(|o| o.accepted()),
            )?,
            EventFamily::InstructorAdd => self.process_instructor(InstructorChange::Add, &body).await?,
            EventFamily::InstructorDrop => self.process_instructor(InstructorChange::Drop, &body).await?,
            EventFamily::Person => self.process_person(&body)?,
            EventFamily::Group => 0,
        };
        self.record(family, events)
    }

    async fn gather(
        &self,
        family: EventFamily,
        queue: &dyn MessageQueue,
        options: GatherOptions,
    ) -> Result<GatherReport, IntakeError> {
        let mut report = GatherReport::new(family);
        // Bodies left on the queue this run; seeing one again means the
        // lease already expired and the queue has nothing new to offer.
        let mut left_behind: HashSet<String> = HashSet::new();
        loop {
            let messages = queue
                .receive(options.max_messages, options.visibility_timeout)
                .await?;
            if messages.is_empty() {
                break;
            }
            report.received += messages.len();

            let mut redelivered = false;
            for message in messages {
                if left_behind.contains(&message.body) {
                    redelivered = true;
                    continue;
                }
                match self.process(family, &message.body).await {
                    Ok(outcome) => {
                        queue.delete(&message.receipt).await?;
                        report.acknowledged += 1;
                        report.events += outcome.events();
                    }
                    Err(e) if e.is_protocol() => {
                        error!(family = %family, receipt = %message.receipt, "rejected message: {e}");
                        report.rejected.push(e.to_string());
                        left_behind.insert(message.body);
                    }
                    Err(e) => {
                        error!(family = %family, receipt = %message.receipt, "cannot process message: {e}");
                        report.failed.push(e.to_string());
                        left_behind.insert(message.body);
                    }
                }
            }
            if redelivered {
                warn!(family = %family, "left-behind message redelivered within the run, stopping");
                break;
            }
        }
        info!(
            family = %family,
            received = report.received,
            acknowledged = report.acknowledged,
            events = report.events,
            "gather complete"
        );
        Ok(report)
    }
}
