//! Access-control behaviour of documents, run against every backend.

mod common;

use bytes::Bytes;
use nerodesk_store::{Action, DecisionReason};
use tokio_test::{assert_err, assert_ok};

use common::*;

#[tokio::test]
async fn test_owner_can_do_everything() {
    for (label, registry) in registries() {
        let doc = registry.tenant(owner()).document("owned.txt");

        for visible in [false, true] {
            assert_ok!(doc.write(&owner(), Bytes::from_static(b"v1")).await);
            assert_ok!(doc.set_visibility(&owner(), visible).await);
            assert_ok!(doc.add_friend(&owner(), friend()).await);
            assert_eq!(doc.read(&owner()).await.unwrap(), Bytes::from_static(b"v1"), "{label}");
            assert_ok!(doc.eject_friend(&owner(), &friend()).await);
            assert_ok!(doc.delete(&owner()).await);
        }
    }
}

#[tokio::test]
async fn test_private_document_denies_strangers() {
    for (label, registry) in registries() {
        let doc = registry.tenant(owner()).document("secret.txt");
        doc.write(&owner(), Bytes::from_static(b"secret")).await.unwrap();
        doc.add_friend(&owner(), friend()).await.unwrap();

        assert_denied(doc.read(&stranger()).await, label);
        assert_denied(doc.size(&stranger()).await, label);
        assert_eq!(doc.read(&friend()).await.unwrap(), Bytes::from_static(b"secret"));
    }
}

#[tokio::test]
async fn test_only_owner_mutates() {
    for (label, registry) in registries() {
        let doc = registry.tenant(owner()).document("shared.txt");
        doc.write(&owner(), Bytes::from_static(b"original")).await.unwrap();
        doc.add_friend(&owner(), friend()).await.unwrap();
        doc.set_visibility(&owner(), true).await.unwrap();

        for actor in [friend(), stranger()] {
            assert_denied(doc.write(&actor, Bytes::from_static(b"x")).await, label);
            assert_denied(doc.delete(&actor).await, label);
            assert_denied(doc.add_friend(&actor, stranger()).await, label);
            assert_denied(doc.eject_friend(&actor, &friend()).await, label);
            assert_denied(doc.set_visibility(&actor, false).await, label);
            assert_denied(doc.attributes(&actor).await, label);
        }

        assert_eq!(doc.read(&owner()).await.unwrap(), Bytes::from_static(b"original"));
        let attrs = doc.attributes(&owner()).await.unwrap();
        assert!(attrs.visible(), "{label}");
        assert!(attrs.is_friend(&friend()), "{label}");
    }
}

#[tokio::test]
async fn test_add_then_eject_friend_restores_access() {
    for (label, registry) in registries() {
        let doc = registry.tenant(owner()).document("round-trip.txt");
        doc.write(&owner(), Bytes::from_static(b"data")).await.unwrap();

        let before = doc.authorize(&friend(), Action::Read).await.unwrap();
        assert!(!before.allowed, "{label}");

        doc.add_friend(&owner(), friend()).await.unwrap();
        doc.add_friend(&owner(), friend()).await.unwrap();
        assert_ok!(doc.read(&friend()).await);

        doc.eject_friend(&owner(), &friend()).await.unwrap();
        doc.eject_friend(&owner(), &friend()).await.unwrap();

        let after = doc.authorize(&friend(), Action::Read).await.unwrap();
        assert_eq!(before, after, "{label}");
        assert_denied(doc.read(&friend()).await, label);
    }
}

#[tokio::test]
async fn test_visibility_toggles_public_read() {
    for (label, registry) in registries() {
        let doc = registry.tenant(owner()).document("public.txt");
        doc.write(&owner(), Bytes::from_static(b"hello world")).await.unwrap();

        doc.set_visibility(&owner(), true).await.unwrap();
        assert_eq!(
            doc.read(&stranger()).await.unwrap(),
            Bytes::from_static(b"hello world"),
            "{label}"
        );
        assert_eq!(
            doc.authorize(&stranger(), Action::Read).await.unwrap().reason,
            DecisionReason::Visible
        );

        doc.set_visibility(&owner(), false).await.unwrap();
        assert_denied(doc.read(&stranger()).await, label);
    }
}

#[tokio::test]
async fn test_unauthorized_reader_cannot_probe_existence() {
    for (label, registry) in registries() {
        let collection = registry.tenant(owner());
        let present = collection.document("present.txt");
        present.write(&owner(), Bytes::from_static(b"x")).await.unwrap();
        let missing = collection.document("missing.txt");

        let a = present.read(&stranger()).await.unwrap_err();
        let b = missing.read(&stranger()).await.unwrap_err();
        assert!(a.is_permission_denied() && b.is_permission_denied(), "{label}");
        assert!(a.is_lookup_failure() && b.is_lookup_failure(), "{label}");

        // The owner does learn about absence.
        assert_not_found(missing.read(&owner()).await, label);
    }
}

#[tokio::test]
async fn test_friend_of_absent_document_sees_not_found() {
    for (label, registry) in registries() {
        let doc = registry.tenant(owner()).document("later.txt");
        doc.add_friend(&owner(), friend()).await.unwrap();

        assert!(!doc.exists().await.unwrap(), "{label}");
        assert_not_found(doc.read(&friend()).await, label);

        doc.write(&owner(), Bytes::from_static(b"now")).await.unwrap();
        assert_eq!(doc.read(&friend()).await.unwrap(), Bytes::from_static(b"now"));
    }
}

#[tokio::test]
async fn test_delete_clears_attributes() {
    for (label, registry) in registries() {
        let doc = registry.tenant(owner()).document("gone.txt");
        doc.write(&owner(), Bytes::from_static(b"x")).await.unwrap();
        doc.set_visibility(&owner(), true).await.unwrap();
        doc.add_friend(&owner(), friend()).await.unwrap();

        doc.delete(&owner()).await.unwrap();
        assert_not_found(doc.delete(&owner()).await, label);

        // A recreated document starts private again.
        doc.write(&owner(), Bytes::from_static(b"y")).await.unwrap();
        assert_denied(doc.read(&stranger()).await, label);
        assert_denied(doc.read(&friend()).await, label);
    }
}

#[tokio::test]
async fn test_friends_are_per_document() {
    for (label, registry) in registries() {
        let collection = registry.tenant(owner());
        let a = collection.document("a.txt");
        let b = collection.document("b.txt");
        a.write(&owner(), Bytes::from_static(b"a")).await.unwrap();
        b.write(&owner(), Bytes::from_static(b"b")).await.unwrap();

        a.add_friend(&owner(), friend()).await.unwrap();
        assert_ok!(a.read(&friend()).await);
        assert_denied(b.read(&friend()).await, label);
    }
}

#[tokio::test]
async fn test_invalid_names_rejected() {
    for (_, registry) in registries() {
        let collection = registry.tenant(owner());
        assert_err!(collection.document("").write(&owner(), Bytes::new()).await);
        assert_err!(collection.document("nul\0name").read(&owner()).await);
        assert_err!(collection.exists("").await);
    }
}
