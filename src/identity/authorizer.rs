use super::session::Session;

/// Anything scoped by entitlement. For cameras the key is the camera id; for alerts it is
/// the id of the camera that raised them.
pub trait Resource {
    fn id(&self) -> &str;
    fn entitlement_key(&self) -> &str;
}

/// Subset of `all` the session may see, in input order. No identity sees nothing.
pub fn visible_resources<'a, R: Resource>(session: &Session, all: &'a [R]) -> Vec<&'a R> {
    let Some(identity) = session.identity.as_ref() else { return Vec::new() };
    all.iter().filter(|r| identity.role.permits(r.entitlement_key())).collect()
}

pub fn can_view<R: Resource>(session: &Session, resource: &R) -> bool {
    session
        .identity
        .as_ref()
        .map(|i| i.role.permits(resource.entitlement_key()))
        .unwrap_or(false)
}

/// Look a resource up by id and apply `can_view`. Unknown ids and invisible resources
/// both come back as `None`.
pub fn find_visible<'a, R: Resource>(session: &Session, all: &'a [R], id: &str) -> Option<&'a R> {
    all.iter().find(|r| r.id() == id).filter(|r| can_view(session, *r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Identity, Role};

    #[derive(Debug, PartialEq)]
    struct Cam(&'static str);
    impl Resource for Cam {
        fn id(&self) -> &str { self.0 }
        fn entitlement_key(&self) -> &str { self.0 }
    }

    #[derive(Debug, PartialEq)]
    struct Alarm { id: &'static str, camera: &'static str }
    impl Resource for Alarm {
        fn id(&self) -> &str { self.id }
        fn entitlement_key(&self) -> &str { self.camera }
    }

    fn cams() -> Vec<Cam> { vec![Cam("camera-1"), Cam("camera-2"), Cam("camera-3")] }

    fn client(ids: &[&str]) -> Session {
        Session::signed_in(Identity::new("2", "Client Demo", "client@example.com", Role::client(ids.iter().copied())))
    }

    fn admin() -> Session { Session::signed_in(Identity::new("1", "Admin User", "admin@x.com", Role::Admin)) }

    fn ids<'a>(v: &[&'a Cam]) -> Vec<&'a str> { v.iter().map(|c| c.0).collect() }

    #[test]
    fn client_sees_entitled_subsequence() {
        let all = cams();
        let s = client(&["camera-2", "camera-1"]);
        assert_eq!(ids(&visible_resources(&s, &all)), vec!["camera-1", "camera-2"]);
    }

    #[test]
    fn admin_sees_everything_in_order() {
        let all = vec![Cam("camera-3"), Cam("camera-1"), Cam("camera-2")];
        assert_eq!(ids(&visible_resources(&admin(), &all)), vec!["camera-3", "camera-1", "camera-2"]);
    }

    #[test]
    fn anonymous_and_empty_entitlements_see_nothing() {
        let all = cams();
        assert!(visible_resources(&Session::empty(), &all).is_empty());
        assert!(visible_resources(&Session::pending(), &all).is_empty());
        assert!(visible_resources(&client(&[]), &all).is_empty());
    }

    #[test]
    fn removing_an_entitlement_hides_it_next_call() {
        let all = cams();
        assert_eq!(visible_resources(&client(&["camera-1", "camera-3"]), &all).len(), 2);
        assert_eq!(ids(&visible_resources(&client(&["camera-3"]), &all)), vec!["camera-3"]);
    }

    #[test]
    fn can_view_agrees_with_visible_resources() {
        let sessions = [Session::empty(), admin(), client(&["camera-1"]), client(&[])];
        for s in &sessions {
            for c in cams() {
                let single = [c];
                assert_eq!(can_view(s, &single[0]), visible_resources(s, &single).len() == 1);
            }
        }
    }

    #[test]
    fn alerts_scoped_by_camera() {
        let alerts = vec![
            Alarm { id: "alert-1", camera: "camera-1" },
            Alarm { id: "alert-2", camera: "camera-3" },
            Alarm { id: "alert-3", camera: "camera-2" },
        ];
        let s = client(&["camera-1", "camera-2"]);
        let seen: Vec<&str> = visible_resources(&s, &alerts).iter().map(|a| a.id).collect();
        assert_eq!(seen, vec!["alert-1", "alert-3"]);
    }

    #[test]
    fn find_visible_treats_miss_as_invisible() {
        let all = cams();
        let s = client(&["camera-1"]);
        assert_eq!(find_visible(&s, &all, "camera-1"), Some(&all[0]));
        assert_eq!(find_visible(&s, &all, "camera-2"), None);
        assert_eq!(find_visible(&s, &all, "camera-404"), None);
        assert_eq!(find_visible(&admin(), &all, "camera-3"), Some(&all[2]));
    }
}
