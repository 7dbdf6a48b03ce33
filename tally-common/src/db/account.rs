use diesel::result::DatabaseErrorKind;
use diesel::{dsl, ExpressionMethods, JoinOnDsl, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::joint_account::{JointAccount, NewJointAccount};
use crate::models::joint_account_invite::{InviteStatus, JointAccountInvite, NewJointAccountInvite};
use crate::models::joint_account_member::{
    AccountRole, JointAccountMember, NewJointAccountMember,
};
use crate::request_io::outputs::OutputInvitation;
use crate::schema::joint_account_invites as invite_fields;
use crate::schema::joint_account_invites::dsl::joint_account_invites;
use crate::schema::joint_account_members as member_fields;
use crate::schema::joint_account_members::dsl::joint_account_members;
use crate::schema::joint_accounts as joint_account_fields;
use crate::schema::joint_accounts::dsl::joint_accounts;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_joint_account(
        &self,
        name: &str,
        primary_currency: &str,
        admin_user_id: Uuid,
    ) -> Result<JointAccount, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let current_time = SystemTime::now();

        let new_account = NewJointAccount {
            id: Uuid::now_v7(),
            name,
            primary_currency,
            admin_user_id,
            modified_timestamp: current_time,
            created_timestamp: current_time,
        };

        let admin_membership = NewJointAccountMember {
            joint_account_id: new_account.id,
            user_id: admin_user_id,
            role: AccountRole::Admin.into(),
            joined_timestamp: current_time,
        };

        let account = db_connection
            .build_transaction()
            .run::<_, diesel::result::Error, _>(|conn| {
                let account = dsl::insert_into(joint_accounts)
                    .values(&new_account)
                    .get_result::<JointAccount>(conn)?;

                dsl::insert_into(joint_account_members)
                    .values(&admin_membership)
                    .execute(conn)?;

                Ok(account)
            })?;

        Ok(account)
    }

    /// The membership authority. Every guarded operation resolves the acting
    /// user through this lookup before touching the account's data.
    pub fn get_membership(
        &self,
        joint_account_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<JointAccountMember>, DaoError> {
        Ok(joint_account_members
            .find((joint_account_id, user_id))
            .get_result::<JointAccountMember>(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    pub fn get_joint_account(&self, joint_account_id: Uuid) -> Result<JointAccount, DaoError> {
        Ok(joint_accounts
            .find(joint_account_id)
            .get_result::<JointAccount>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_joint_accounts_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(JointAccount, i16)>, DaoError> {
        Ok(joint_account_members
            .inner_join(joint_accounts)
            .filter(member_fields::user_id.eq(user_id))
            .select((joint_account_fields::all_columns, member_fields::role))
            .order(joint_account_fields::created_timestamp.asc())
            .load::<(JointAccount, i16)>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn update_joint_account(
        &self,
        joint_account_id: Uuid,
        name: &str,
        primary_currency: &str,
    ) -> Result<JointAccount, DaoError> {
        Ok(dsl::update(joint_accounts.find(joint_account_id))
            .set((
                joint_account_fields::name.eq(name),
                joint_account_fields::primary_currency.eq(primary_currency),
                joint_account_fields::modified_timestamp.eq(dsl::now),
            ))
            .get_result::<JointAccount>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_joint_account(&self, joint_account_id: Uuid) -> Result<(), DaoError> {
        let affected_row_count = diesel::delete(joint_accounts.find(joint_account_id))
            .execute(&mut self.db_thread_pool.get()?)?;

        if affected_row_count == 0 {
            return Err(diesel::result::Error::NotFound.into());
        }

        Ok(())
    }

    pub fn get_members(
        &self,
        joint_account_id: Uuid,
    ) -> Result<Vec<(JointAccountMember, String, String)>, DaoError> {
        Ok(joint_account_members
            .inner_join(users)
            .filter(member_fields::joint_account_id.eq(joint_account_id))
            .select((
                member_fields::all_columns,
                user_fields::name,
                user_fields::email,
            ))
            .order(member_fields::joined_timestamp.asc())
            .load::<(JointAccountMember, String, String)>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_member_user_ids(&self, joint_account_id: Uuid) -> Result<Vec<Uuid>, DaoError> {
        Ok(joint_account_members
            .filter(member_fields::joint_account_id.eq(joint_account_id))
            .select(member_fields::user_id)
            .load::<Uuid>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn set_member_role(
        &self,
        joint_account_id: Uuid,
        target_user_id: Uuid,
        role: AccountRole,
    ) -> Result<JointAccountMember, DaoError> {
        if role == AccountRole::Admin {
            return Err(DaoError::InvalidState("The admin role cannot be assigned."));
        }

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let admin_user_id = joint_accounts
                    .select(joint_account_fields::admin_user_id)
                    .find(joint_account_id)
                    .get_result::<Uuid>(conn)?;

                if admin_user_id == target_user_id {
                    return Err(DaoError::InvalidState("The admin's role cannot be changed."));
                }

                Ok(dsl::update(
                    joint_account_members.find((joint_account_id, target_user_id)),
                )
                .set(member_fields::role.eq(i16::from(role)))
                .get_result::<JointAccountMember>(conn)?)
            })
    }

    pub fn remove_member(
        &self,
        joint_account_id: Uuid,
        target_user_id: Uuid,
    ) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let admin_user_id = joint_accounts
                    .select(joint_account_fields::admin_user_id)
                    .find(joint_account_id)
                    .get_result::<Uuid>(conn)?;

                if admin_user_id == target_user_id {
                    return Err(DaoError::InvalidState(
                        "Admin cannot be removed from their own account.",
                    ));
                }

                let affected_row_count = diesel::delete(
                    joint_account_members.find((joint_account_id, target_user_id)),
                )
                .execute(conn)?;

                if affected_row_count == 0 {
                    return Err(diesel::result::Error::NotFound.into());
                }

                Ok(())
            })
    }

    pub fn leave_account(&self, joint_account_id: Uuid, user_id: Uuid) -> Result<(), DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let admin_user_id = joint_accounts
                    .select(joint_account_fields::admin_user_id)
                    .find(joint_account_id)
                    .get_result::<Uuid>(conn)?;

                if admin_user_id == user_id {
                    return Err(DaoError::InvalidState(
                        "Admin cannot leave their own account.",
                    ));
                }

                let affected_row_count =
                    diesel::delete(joint_account_members.find((joint_account_id, user_id)))
                        .execute(conn)?;

                if affected_row_count == 0 {
                    return Err(diesel::result::Error::NotFound.into());
                }

                Ok(())
            })
    }

    pub fn create_invitation(
        &self,
        joint_account_id: Uuid,
        invited_email: &str,
        invited_by_user_id: Uuid,
        lifetime: Duration,
    ) -> Result<JointAccountInvite, DaoError> {
        let email_lowercase = invited_email.to_lowercase();
        let current_time = SystemTime::now();

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .repeatable_read()
            .run::<_, DaoError, _>(|conn| {
                let existing_member_count = joint_account_members
                    .inner_join(users)
                    .filter(member_fields::joint_account_id.eq(joint_account_id))
                    .filter(user_fields::email.eq(&email_lowercase))
                    .count()
                    .get_result::<i64>(conn)?;

                if existing_member_count != 0 {
                    return Err(DaoError::ConflictWithExisting(
                        "User is already a member of this account.",
                    ));
                }

                let pending_invite_count = joint_account_invites
                    .filter(invite_fields::joint_account_id.eq(joint_account_id))
                    .filter(invite_fields::invited_email.eq(&email_lowercase))
                    .filter(invite_fields::status.eq(i16::from(InviteStatus::Pending)))
                    .filter(invite_fields::expiration.gt(current_time))
                    .count()
                    .get_result::<i64>(conn)?;

                if pending_invite_count != 0 {
                    return Err(DaoError::ConflictWithExisting("Invitation already pending."));
                }

                let new_invite = NewJointAccountInvite {
                    id: Uuid::now_v7(),
                    joint_account_id,
                    invited_email: &email_lowercase,
                    invited_by_user_id,
                    status: InviteStatus::Pending.into(),
                    expiration: current_time + lifetime,
                    created_timestamp: current_time,
                };

                Ok(dsl::insert_into(joint_account_invites)
                    .values(&new_invite)
                    .get_result::<JointAccountInvite>(conn)?)
            })
    }

    pub fn get_invitation(&self, invitation_id: Uuid) -> Result<JointAccountInvite, DaoError> {
        Ok(joint_account_invites
            .find(invitation_id)
            .get_result::<JointAccountInvite>(&mut self.db_thread_pool.get()?)?)
    }

    /// Flips the invite to accepted and creates the membership row in a single
    /// transaction so the two can never diverge.
    pub fn accept_invitation(
        &self,
        invitation_id: Uuid,
        recipient_email: &str,
        recipient_user_id: Uuid,
    ) -> Result<JointAccountInvite, DaoError> {
        let email_lowercase = recipient_email.to_lowercase();

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let invite = joint_account_invites
                    .find(invitation_id)
                    .get_result::<JointAccountInvite>(conn)?;

                Self::validate_invite_response(&invite, &email_lowercase)?;

                let new_member = NewJointAccountMember {
                    joint_account_id: invite.joint_account_id,
                    user_id: recipient_user_id,
                    role: AccountRole::Editor.into(),
                    joined_timestamp: SystemTime::now(),
                };

                let membership_insert = dsl::insert_into(joint_account_members)
                    .values(&new_member)
                    .execute(conn);

                if let Err(e) = membership_insert {
                    return match e {
                        diesel::result::Error::DatabaseError(
                            DatabaseErrorKind::UniqueViolation,
                            _,
                        ) => Err(DaoError::ConflictWithExisting(
                            "User is already a member of this account.",
                        )),
                        _ => Err(e.into()),
                    };
                }

                Ok(dsl::update(joint_account_invites.find(invitation_id))
                    .set(invite_fields::status.eq(i16::from(InviteStatus::Accepted)))
                    .get_result::<JointAccountInvite>(conn)?)
            })
    }

    pub fn decline_invitation(
        &self,
        invitation_id: Uuid,
        recipient_email: &str,
    ) -> Result<JointAccountInvite, DaoError> {
        let email_lowercase = recipient_email.to_lowercase();

        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let invite = joint_account_invites
                    .find(invitation_id)
                    .get_result::<JointAccountInvite>(conn)?;

                Self::validate_invite_response(&invite, &email_lowercase)?;

                Ok(dsl::update(joint_account_invites.find(invitation_id))
                    .set(invite_fields::status.eq(i16::from(InviteStatus::Declined)))
                    .get_result::<JointAccountInvite>(conn)?)
            })
    }

    fn validate_invite_response(
        invite: &JointAccountInvite,
        recipient_email_lowercase: &str,
    ) -> Result<(), DaoError> {
        if invite.invited_email != recipient_email_lowercase {
            return Err(DaoError::Disallowed(
                "Invitation was addressed to a different email.",
            ));
        }

        if invite.status != i16::from(InviteStatus::Pending) {
            return Err(DaoError::InvalidState(
                "Invitation has already been responded to.",
            ));
        }

        // Expiry wins over stored status
        if invite.expiration < SystemTime::now() {
            return Err(DaoError::OutOfDate("Invitation has expired."));
        }

        Ok(())
    }

    pub fn get_pending_invitations_for_email(
        &self,
        email: &str,
    ) -> Result<Vec<OutputInvitation>, DaoError> {
        Ok(joint_account_invites
            .inner_join(joint_accounts)
            .inner_join(users.on(user_fields::id.eq(invite_fields::invited_by_user_id)))
            .filter(invite_fields::invited_email.eq(email.to_lowercase()))
            .filter(invite_fields::status.eq(i16::from(InviteStatus::Pending)))
            .filter(invite_fields::expiration.gt(SystemTime::now()))
            .select((
                invite_fields::id,
                invite_fields::joint_account_id,
                joint_account_fields::name,
                invite_fields::invited_email,
                invite_fields::invited_by_user_id,
                user_fields::name,
                invite_fields::status,
                invite_fields::expiration,
                invite_fields::created_timestamp,
            ))
            .order(invite_fields::created_timestamp.desc())
            .load::<OutputInvitation>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_pending_invitations_for_account(
        &self,
        joint_account_id: Uuid,
    ) -> Result<Vec<OutputInvitation>, DaoError> {
        Ok(joint_account_invites
            .inner_join(joint_accounts)
            .inner_join(users.on(user_fields::id.eq(invite_fields::invited_by_user_id)))
            .filter(invite_fields::joint_account_id.eq(joint_account_id))
            .filter(invite_fields::status.eq(i16::from(InviteStatus::Pending)))
            .filter(invite_fields::expiration.gt(SystemTime::now()))
            .select((
                invite_fields::id,
                invite_fields::joint_account_id,
                joint_account_fields::name,
                invite_fields::invited_email,
                invite_fields::invited_by_user_id,
                user_fields::name,
                invite_fields::status,
                invite_fields::expiration,
                invite_fields::created_timestamp,
            ))
            .order(invite_fields::created_timestamp.desc())
            .load::<OutputInvitation>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_all_expired_invitations(
        &self,
        grace_period: Duration,
    ) -> Result<usize, DaoError> {
        let cutoff = SystemTime::now() - grace_period;

        Ok(diesel::delete(
            joint_account_invites.filter(invite_fields::expiration.lt(cutoff)),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}
