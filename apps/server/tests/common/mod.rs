#![allow(dead_code)]

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use motscore::store::{self, create_user, populate_volumes};
use motscore::Selection;
use motscore_server::app::{router, AppState, Settings};
use ndarray::Array3;
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;
use tower::ServiceExt;

/// 在 `parent/name` 下建立有 `n_sub` 个受试者的 BIDS 数据集, 体积以 RAS 方向存储.
pub fn bids_dataset(parent: &Path, name: &str, n_sub: usize) -> PathBuf {
    let root = parent.join(name);
    for s in 0..n_sub {
        let anat = root.join(format!("sub-{s:02}/ses-1/anat"));
        std::fs::create_dir_all(&anat).unwrap();
        let header = NiftiHeader {
            sform_code: 1,
            srow_x: [1.0, 0.0, 0.0, 0.0],
            srow_y: [0.0, 1.0, 0.0, 0.0],
            srow_z: [0.0, 0.0, 1.0, 0.0],
            pixdim: [1.0; 8],
            ..NiftiHeader::default()
        };
        let data = Array3::from_shape_fn((20, 22, 24), |(i, j, k)| (s + i * 1000 + j * 30 + k) as f32);
        WriterOptions::new(anat.join(format!("sub-{s:02}_ses-1_T1w.nii.gz")))
            .reference_header(&header)
            .write_nifti(&data)
            .unwrap();
    }
    root
}

/// 3 个体积, 评审者 `test`, 按主键顺序选取.
pub struct TestApp {
    pub dir: tempfile::TempDir,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = bids_dataset(dir.path(), "bids_sub_ses", 3);
        let mut conn = store::open_db(dir.path().join("test.sqlite")).unwrap();
        create_user(&conn, "fake@email.com", Some("test")).unwrap();
        populate_volumes(&mut conn, &root, "T1w").unwrap();

        let settings = Settings {
            selection: Selection::Sequential,
            ..Settings::default()
        };
        let router = router(AppState::new(conn, settings));
        Self { dir, router }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(c) = cookie {
            req = req.header(header::COOKIE, c);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, cookie: &str, body: serde_json::Value) -> Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }

    pub async fn post_login(&self, code: &str) -> Response<Body> {
        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("user_code={code}")))
            .unwrap();
        self.send(req).await
    }

    /// 登录并返回可用于 `Cookie` 请求头的值.
    pub async fn login(&self, code: &str) -> String {
        let resp = self.post_login(code).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers()[header::LOCATION].to_str().unwrap()
}
