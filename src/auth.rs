use uuid::Uuid;

/// Who is reading. Handed to anything that branches on sign-in state instead
/// of being looked up from process-wide state; read once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthContext {
    viewer_id: Option<Uuid>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self { viewer_id: None }
    }

    pub fn authenticated(user_id: Uuid) -> Self {
        Self {
            viewer_id: Some(user_id),
        }
    }

    pub fn viewer_id(&self) -> Option<Uuid> {
        self.viewer_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.viewer_id.is_some()
    }
}
